//! # Cache Error Types
//!
//! Failures of the cache store itself. A missing key is NOT an error: stores
//! report it as `Ok(None)`.

use thiserror::Error;

/// Result type alias for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache store failure.
///
/// ## When This Occurs
/// - Redis unreachable, connection dropped, or a command rejected
/// - A value could not be encoded to JSON before a write
///
/// The read-through layer never surfaces these to its caller: a failing
/// store degrades to "no cache".
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the store.
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),

    /// The store rejected or failed a command.
    #[error("Cache command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// Value could not be encoded for storage.
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
