//! # posbe-cache: Read-Through Cache
//!
//! Cache-first reads of reference data (roles, units, categories, store
//! preferences) over a pluggable key/value store.
//!
//! ## Module Structure
//! ```text
//! posbe_cache
//! ├── error         - CacheError, CacheResult
//! ├── store         - CacheStore contract (get / set / delete)
//! ├── redis_store   - RedisCacheStore (production)
//! ├── memory        - MemoryCacheStore (tests, no-Redis mode)
//! └── read_through  - ReadThroughCache::cache_first_data + invalidate
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use posbe_cache::{CacheDataSupplied, ReadThroughCache};
//!
//! let cache = ReadThroughCache::in_memory();
//! let roles = cache
//!     .cache_first_data(CacheDataSupplied::new("roles", cache.ttl(), || async {
//!         db.roles().all().await
//!     }))
//!     .await?;
//! ```

pub mod error;
pub mod memory;
pub mod read_through;
pub mod redis_store;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCacheStore;
pub use read_through::{CacheDataSupplied, ReadThroughCache, DEFAULT_TTL};
pub use redis_store::RedisCacheStore;
pub use store::CacheStore;
