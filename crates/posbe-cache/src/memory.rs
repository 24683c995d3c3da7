//! # In-Memory Cache Store
//!
//! A [`CacheStore`] for tests and for running without Redis.
//!
//! Expiry uses `tokio::time::Instant`, so tests can drive it with
//! `tokio::time::pause()` / `advance()`. Expired entries are dropped lazily
//! on the next `get`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::CacheResult;
use crate::store::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of `key`; `None` when missing, expired, or stored
    /// without a TTL.
    pub async fn expires_in(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now)
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryCacheStore::new();
        assert_eq!(store.get("roles").await.unwrap(), None);

        store
            .set("roles", b"[]".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("roles").await.unwrap(), Some(b"[]".to_vec()));

        store.delete("roles").await.unwrap();
        assert_eq!(store.get("roles").await.unwrap(), None);

        // deleting a missing key is fine
        store.delete("roles").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryCacheStore::new();
        store
            .set("units", b"[1]".to_vec(), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(store.expires_in("units").await, Some(Duration::from_secs(30)));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(store.get("units").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("units").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = MemoryCacheStore::new();
        store.set("addons", b"{}".to_vec(), Duration::ZERO).await.unwrap();
        assert_eq!(store.expires_in("addons").await, None);

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(store.get("addons").await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }
}
