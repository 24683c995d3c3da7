//! # Store Preference Service
//!
//! Key/value settings of the store (name, currency, feature flags). The
//! full map is cached under [`STORE_PREFS_CACHE_KEY`]; updates invalidate
//! it.

use std::sync::Arc;

use posbe_cache::{CacheDataSupplied, ReadThroughCache};
use posbe_core::{validate_row, ServiceError, StoreSetting};
use posbe_db::{Database, StorePrefRepository};

pub const STORE_PREFS_CACHE_KEY: &str = "store_prefs";

/// Turns table service (floor plan with tables) on or off.
pub const FEATURE_TABLE: &str = "feature_table";

/// Turns room booking on or off.
pub const FEATURE_ROOM: &str = "feature_room";

#[derive(Clone)]
pub struct StorePrefService {
    prefs: Arc<dyn StorePrefRepository>,
    cache: ReadThroughCache,
}

impl StorePrefService {
    pub fn new(db: &Database, cache: ReadThroughCache) -> Self {
        StorePrefService {
            prefs: Arc::new(db.store_prefs()),
            cache,
        }
    }

    pub async fn all_prefs(&self) -> Result<StoreSetting, ServiceError> {
        let prefs = self.prefs.as_ref();
        self.cache
            .cache_first_data(CacheDataSupplied::new(
                STORE_PREFS_CACHE_KEY,
                self.cache.ttl(),
                move || async move { validate_row(prefs.all().await) },
            ))
            .await
    }

    /// Sets an existing preference; unknown keys are `NotFound`.
    pub async fn update_prefs(&self, key: &str, value: &str) -> Result<StoreSetting, ServiceError> {
        validate_row(self.prefs.find(key).await)?;

        let updated = self
            .prefs
            .update(key, value)
            .await
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        self.cache.invalidate(STORE_PREFS_CACHE_KEY).await;
        Ok(updated)
    }

    /// Whether the boolean preference `key` is `"true"`. Missing keys are off.
    pub async fn feature_enabled(&self, key: &str) -> Result<bool, ServiceError> {
        let prefs = self.all_prefs().await?;
        Ok(prefs.get(key).is_some_and(|v| v == "true"))
    }
}
