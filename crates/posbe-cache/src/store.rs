//! # Cache Store Contract
//!
//! The key/value surface the read-through cache needs, nothing more.
//!
//! ```text
//! get(key)              → Ok(Some(bytes))  hit
//!                       → Ok(None)         true absence (safe to populate)
//!                       → Err(_)           store failure (do not populate)
//! set(key, bytes, ttl)  → single-key atomic write, ttl = 0 means no expiry
//! delete(key)           → removing a missing key is Ok
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// External key/value store holding encoded cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}
