//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. `RUST_LOG` is read separately by [`crate::logging`].

use std::env;
use std::time::Duration;

use posbe_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file (`:memory:` for a throwaway database)
    pub database_path: String,

    /// Maximum pool connections
    pub database_max_connections: u32,

    /// Redis connection string (optional; in-memory cache without it)
    pub redis_url: Option<String>,

    /// Lifetime of cached reference lists in seconds
    pub cache_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "./posbe.db".to_string(),
            database_max_connections: 5,
            redis_url: None,
            cache_ttl_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let database_path = var("DATABASE_PATH").unwrap_or(defaults.database_path);
        if database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_PATH".to_string()));
        }

        let config = AppConfig {
            database_path,

            database_max_connections: match var("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .parse()
                    .ok()
                    .filter(|max: &u32| *max > 0)
                    .ok_or_else(|| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,
                None => defaults.database_max_connections,
            },

            redis_url: var("REDIS_URL").filter(|url| !url.trim().is_empty()),

            cache_ttl_secs: match var("CACHE_TTL_SECS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("CACHE_TTL_SECS".to_string()))?,
                None => defaults.cache_ttl_secs,
            },
        };

        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Pool settings for this configuration.
    ///
    /// `:memory:` always gets a single connection, since each connection
    /// would otherwise open its own empty database.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database_path).max_connections(self.database_max_connections)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
