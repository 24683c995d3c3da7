//! # Redis Cache Store
//!
//! Production [`CacheStore`] over an async `ConnectionManager`.
//!
//! The manager is cheap to clone and reconnects by itself after a dropped
//! connection, so every call clones it instead of holding a lock.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::error::{CacheError, CacheResult};
use crate::store::CacheStore;

/// Redis-backed cache store.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    /// Opens a managed connection to `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// ## When This Fails
    /// - Malformed URL
    /// - Server unreachable at startup
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        info!("Connected to Redis");
        Ok(RedisCacheStore { conn })
    }

    /// Round-trips a PING.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();

        if ttl.is_zero() {
            let _: () = conn.set(key, value).await?;
        } else {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            let _: () = conn.pset_ex(key, value, millis).await?;
        }

        debug!(key, ttl_ms = ttl.as_millis() as u64, "Cache entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
