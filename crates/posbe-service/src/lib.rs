//! # posbe-service: Back-Office Services
//!
//! Orchestration over the repositories and the read-through cache. Every
//! operation returns `Result<_, ServiceError>`.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Service Call                                     │
//! │                                                                         │
//! │  handler ──► AccountService::delete_role(7)                            │
//! │                  │                                                      │
//! │                  ├── roles.find(ById, 7)   absence ──► 404 NotFound    │
//! │                  │                         failure ──► 500 Internal    │
//! │                  ├── role.usage >= 1 ──────────────► 403 Forbidden     │
//! │                  ├── roles.delete(role)                                 │
//! │                  └── cache.invalidate("roles")                          │
//! │                                                                         │
//! │  Reference lists (roles, units, categories, ...) are read through the  │
//! │  cache; every write to them invalidates their key.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`account`] - Roles, users, credential check
//! - [`catalog`] - Units, categories, subcategories, addons
//! - [`product`] - Products and their variants
//! - [`store`] - Floors, tables, rooms
//! - [`store_pref`] - Store preferences
//! - [`config`] - Environment configuration
//! - [`logging`] - Tracing bootstrap
//! - [`password`] - Argon2 hashing

pub mod account;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod password;
pub mod product;
pub mod store;
pub mod store_pref;

use std::sync::Arc;

use posbe_cache::{CacheDataSupplied, MemoryCacheStore, ReadThroughCache, RedisCacheStore};
use posbe_core::{validate_row, validate_rows, FindWith, ServiceError};
use posbe_db::{CrudRepository, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

pub use account::AccountService;
pub use catalog::CatalogCommonService;
pub use config::{AppConfig, ConfigError};
pub use product::CatalogProductService;
pub use store::StoreService;
pub use store_pref::StorePrefService;

/// Message of the `Forbidden` error raised when a record is still in use.
pub const UNABLE_TO_DELETE: &str = "unable to delete this data";

// =============================================================================
// Service Bundle
// =============================================================================

/// Every service over one database and one cache.
#[derive(Clone)]
pub struct Services {
    pub account: AccountService,
    pub catalog: CatalogCommonService,
    pub product: CatalogProductService,
    pub store: StoreService,
    pub store_pref: StorePrefService,
}

impl Services {
    pub fn new(db: &Database, cache: ReadThroughCache) -> Self {
        Services {
            account: AccountService::new(db, cache.clone()),
            catalog: CatalogCommonService::new(db, cache.clone()),
            product: CatalogProductService::new(db),
            store: StoreService::new(db),
            store_pref: StorePrefService::new(db, cache),
        }
    }
}

/// Builds the read-through cache for `config`.
///
/// Redis is optional: without `REDIS_URL`, or when it cannot be reached,
/// entries live in process memory.
pub async fn connect_cache(config: &AppConfig) -> ReadThroughCache {
    let cache = match config.redis_url.as_deref() {
        Some(url) => match RedisCacheStore::connect(url).await {
            Ok(store) => ReadThroughCache::new(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, continuing with in-memory cache");
                ReadThroughCache::new(Arc::new(MemoryCacheStore::new()))
            }
        },
        None => {
            info!("Redis not configured, using in-memory cache");
            ReadThroughCache::new(Arc::new(MemoryCacheStore::new()))
        }
    };

    cache.with_ttl(config.cache_ttl())
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// `repo.all()` through the cache under `key`.
pub(crate) async fn cached_list<T, R>(
    cache: &ReadThroughCache,
    key: &str,
    repo: &R,
) -> Result<Vec<T>, ServiceError>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: CrudRepository<T> + ?Sized,
{
    cache
        .cache_first_data(CacheDataSupplied::new(key, cache.ttl(), move || async move {
            validate_rows(repo.all().await)
        }))
        .await
}

/// First half of find-then-delete: absence → 404, failure → 500.
pub(crate) async fn find_by_id<T, R>(repo: &R, id: i64) -> Result<T, ServiceError>
where
    T: Send + Sync + 'static,
    R: CrudRepository<T> + ?Sized,
{
    validate_row(repo.find(FindWith::ById, id.into()).await)
}

/// Finds the record by id, then deletes it.
pub(crate) async fn find_then_delete<T, R>(repo: &R, id: i64) -> Result<(), ServiceError>
where
    T: Send + Sync + 'static,
    R: CrudRepository<T> + ?Sized,
{
    let found = find_by_id(repo, id).await?;
    validate_row(repo.delete(&found).await)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use posbe_cache::{MemoryCacheStore, ReadThroughCache};
    use posbe_db::{Database, DbConfig};

    pub async fn setup() -> (Database, ReadThroughCache, Arc<MemoryCacheStore>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ReadThroughCache::new(store.clone());
        (db, cache, store)
    }
}
