//! # Read-Through Cache
//!
//! Cache-first reads for small, rarely-changing reference lists.
//!
//! ## Per-Call State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      cache_first_data(key, ttl, fallback)               │
//! │                                                                         │
//! │   store.get(key)                                                        │
//! │     ├── Ok(Some(bytes)) ── decode ok ──────────► return cached value    │
//! │     │                  └── decode fails ──┐     (fallback NOT called)   │
//! │     ├── Ok(None) ─────────────────────────┤                             │
//! │     │                                     ▼                             │
//! │     │                               fallback()                          │
//! │     │                                ├── Ok(v)  ─► store.set(key, v,    │
//! │     │                                │             ttl), return Ok(v)   │
//! │     │                                └── Err(e) ─► return Err(e)        │
//! │     │                                              (nothing written)    │
//! │     └── Err(store failure) ─────────► fallback(), return its result     │
//! │                                       verbatim, nothing written         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - a hit never calls the fallback
//! - at most one write per miss, and only for a successful fallback
//! - store failures are logged and never reach the caller
//!
//! Concurrent misses on the same key each call their fallback; the last
//! write wins. Entries expire by TTL only, unless a caller uses
//! [`ReadThroughCache::invalidate`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::memory::MemoryCacheStore;
use crate::store::CacheStore;

/// Default lifetime of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// One cache-first read request.
pub struct CacheDataSupplied<F> {
    pub key: String,
    pub ttl: Duration,
    /// Zero-argument loader that performs the real repository read.
    pub fallback: F,
}

impl<F> CacheDataSupplied<F> {
    pub fn new(key: impl Into<String>, ttl: Duration, fallback: F) -> Self {
        CacheDataSupplied {
            key: key.into(),
            ttl,
            fallback,
        }
    }
}

/// Outcome of the lookup step.
enum Lookup<T> {
    Hit(T),
    /// True absence (or an entry that no longer decodes): populate on success.
    Miss,
    /// Store failure: serve from the fallback, write nothing.
    Unavailable,
}

/// Cache-first reader over any [`CacheStore`].
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        ReadThroughCache {
            store,
            ttl: DEFAULT_TTL,
        }
    }

    /// Backed by a fresh [`MemoryCacheStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// Sets the TTL handed out by [`ttl`](Self::ttl).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The configured default TTL for callers building a request.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the cached value for `supplied.key`, or loads it with
    /// `supplied.fallback` and caches the result.
    ///
    /// The fallback's error is returned verbatim and never cached.
    pub async fn cache_first_data<T, E, F, Fut>(&self, supplied: CacheDataSupplied<F>) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let CacheDataSupplied { key, ttl, fallback } = supplied;

        let lookup = self.lookup::<T>(&key).await;
        let populate = match lookup {
            Lookup::Hit(value) => {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
            Lookup::Miss => true,
            Lookup::Unavailable => false,
        };

        debug!(key = %key, populate, "Cache miss, loading from fallback");
        let value = fallback().await?;

        if populate {
            self.write_back(&key, &value, ttl).await;
        }

        Ok(value)
    }

    /// Drops `key` so the next read goes to the fallback.
    ///
    /// Store failures are logged and swallowed; the entry then lives until
    /// its TTL.
    pub async fn invalidate(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => debug!(key, "Cache entry invalidated"),
            Err(e) => warn!(key, error = %e, "Failed to invalidate cache entry"),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Lookup::Hit(value),
                Err(e) => {
                    warn!(key, error = %e, "Cached entry does not decode, treating as miss");
                    Lookup::Miss
                }
            },
            Ok(None) => Lookup::Miss,
            Err(e) => {
                warn!(key, error = %e, "Cache store unavailable, reading through");
                Lookup::Unavailable
            }
        }
    }

    async fn write_back<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(key, bytes, ttl).await {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, CacheResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every call fails, like an unreachable Redis.
    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::ConnectionFailed("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
            panic!("write-back must not happen when the store is down");
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::ConnectionFailed("connection refused".into()))
        }
    }

    fn setup() -> (ReadThroughCache, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        (ReadThroughCache::new(store.clone()), store)
    }

    fn counted(
        calls: &AtomicUsize,
        result: Result<Vec<String>, String>,
    ) -> impl FnOnce() -> std::future::Ready<Result<Vec<String>, String>> + '_ {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result)
        }
    }

    #[tokio::test]
    async fn test_hit_never_calls_fallback() {
        let (cache, store) = setup();
        store
            .set("roles", br#"["admin","cashier"]"#.to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let roles = cache
            .cache_first_data(CacheDataSupplied::new(
                "roles",
                Duration::from_secs(60),
                counted(&calls, Ok(vec!["stale".into()])),
            ))
            .await
            .unwrap();

        assert_eq!(roles, vec!["admin".to_string(), "cashier".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_populates_once_with_ttl() {
        let (cache, store) = setup();
        let ttl = Duration::from_secs(120);
        let calls = AtomicUsize::new(0);

        let first = cache
            .cache_first_data(CacheDataSupplied::new(
                "units",
                ttl,
                counted(&calls, Ok(vec!["kg".into()])),
            ))
            .await
            .unwrap();
        assert_eq!(first, vec!["kg".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(store.get("units").await.unwrap(), Some(br#"["kg"]"#.to_vec()));
        assert_eq!(store.expires_in("units").await, Some(ttl));

        // served from cache until the ttl elapses
        let second = cache
            .cache_first_data(CacheDataSupplied::new(
                "units",
                ttl,
                counted(&calls, Ok(vec!["g".into()])),
            ))
            .await
            .unwrap();
        assert_eq!(second, vec!["kg".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(ttl).await;
        let third = cache
            .cache_first_data(CacheDataSupplied::new(
                "units",
                ttl,
                counted(&calls, Ok(vec!["g".into()])),
            ))
            .await
            .unwrap();
        assert_eq!(third, vec!["g".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fallback_is_not_cached() {
        let (cache, store) = setup();
        let calls = AtomicUsize::new(0);

        let err = cache
            .cache_first_data(CacheDataSupplied::new(
                "categories",
                Duration::from_secs(60),
                counted(&calls, Err("database is locked".into())),
            ))
            .await
            .unwrap_err();

        assert_eq!(err, "database is locked");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("categories").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_down_reads_through_without_write() {
        let cache = ReadThroughCache::new(Arc::new(DownStore));
        let calls = AtomicUsize::new(0);

        let addons = cache
            .cache_first_data(CacheDataSupplied::new(
                "addons",
                Duration::from_secs(60),
                counted(&calls, Ok(vec!["extra shot".into()])),
            ))
            .await
            .unwrap();

        assert_eq!(addons, vec!["extra shot".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // swallowed
        cache.invalidate("addons").await;
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_overwritten() {
        let (cache, store) = setup();
        store
            .set("roles", b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let roles = cache
            .cache_first_data(CacheDataSupplied::new(
                "roles",
                Duration::from_secs(60),
                counted(&calls, Ok(vec!["admin".into()])),
            ))
            .await
            .unwrap();

        assert_eq!(roles, vec!["admin".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("roles").await.unwrap(), Some(br#"["admin"]"#.to_vec()));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (cache, _store) = setup();
        let calls = AtomicUsize::new(0);
        let ttl = cache.ttl();

        for _ in 0..2 {
            cache
                .cache_first_data(CacheDataSupplied::new(
                    "roles",
                    ttl,
                    counted(&calls, Ok(vec!["admin".into()])),
                ))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("roles").await;
        cache
            .cache_first_data(CacheDataSupplied::new(
                "roles",
                ttl,
                counted(&calls, Ok(vec!["admin".into()])),
            ))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ttl_builder() {
        let cache = ReadThroughCache::in_memory().with_ttl(Duration::from_secs(5));
        assert_eq!(cache.ttl(), Duration::from_secs(5));
        assert_eq!(ReadThroughCache::in_memory().ttl(), DEFAULT_TTL);
    }
}
