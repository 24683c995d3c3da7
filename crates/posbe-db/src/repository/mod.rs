//! # Repository Module
//!
//! Typed repository contracts and their SQLite adapters.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Contracts                                 │
//! │                                                                         │
//! │  Service                                                               │
//! │       │                                                                 │
//! │       │  repo.find(FindWith::BySku, "ESP-01".into())                   │
//! │       ▼                                                                 │
//! │  CrudRepository<T>            (all, find, create, update, delete)      │
//! │   ├── CrudWhereRepository<T>  (+ all_where)    Subcategory, Variant,   │
//! │   │                                            Table, Room             │
//! │   └── CrudSearchRepository<T> (+ search)       Product                 │
//! │                                                                         │
//! │  StorePrefRepository          (find, all, update) over key/value rows  │
//! │       │                                                                 │
//! │       │  QueryBuilder + push_bind (caller values never become SQL)     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Adapters
//!
//! - [`account`] - [`RoleRepository`], [`UserRepository`]
//! - [`catalog`] - [`UnitRepository`], [`CategoryRepository`],
//!   [`SubcategoryRepository`], [`AddonRepository`]
//! - [`product`] - [`ProductRepository`], [`ProductVariantRepository`]
//! - [`store`] - [`FloorRepository`], [`TableRepository`], [`RoomRepository`],
//!   [`StorePrefSqlRepository`]

use async_trait::async_trait;
use chrono::Utc;
use posbe_core::{FindWith, LookupValue, StoreSetting};

use crate::error::DbResult;

pub mod account;
pub mod catalog;
pub mod filter;
pub mod product;
pub mod store;

pub use account::{RoleRepository, UserRepository};
pub use catalog::{AddonRepository, CategoryRepository, SubcategoryRepository, UnitRepository};
pub use product::{ProductRepository, ProductVariantRepository};
pub use store::{FloorRepository, RoomRepository, StorePrefSqlRepository, TableRepository};

// =============================================================================
// Contracts
// =============================================================================

/// Typed CRUD over one entity.
///
/// ## Outcomes
/// - `find` with zero matching rows → `DbError::NotFound` (the absence)
/// - `update` of an id that does not exist → `DbError::NotFound`
/// - `delete` does not check affected rows; deleting a missing row is `Ok`
/// - a key the adapter does not support → `DbError::UnsupportedKey`
#[async_trait]
pub trait CrudRepository<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Every row, ordered by id.
    async fn all(&self) -> DbResult<Vec<T>>;

    /// The first row matching `key = value`.
    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<T>;

    /// Inserts `data` (its id is ignored) and returns the stored row.
    async fn create(&self, data: &T) -> DbResult<T>;

    /// Overwrites the row with `data.id` and returns the stored row.
    async fn update(&self, data: &T) -> DbResult<T>;

    /// Removes the row with `data.id`.
    async fn delete(&self, data: &T) -> DbResult<()>;
}

/// CRUD plus "every row matching one key", used for parent → children reads
/// (`ByRelationId` = parent id).
#[async_trait]
pub trait CrudWhereRepository<T>: CrudRepository<T>
where
    T: Send + Sync + 'static,
{
    async fn all_where(&self, key: FindWith, value: LookupValue) -> DbResult<Vec<T>>;
}

/// CRUD plus a conjunctive multi-key search.
#[async_trait]
pub trait CrudSearchRepository<T>: CrudRepository<T>
where
    T: Send + Sync + 'static,
{
    /// Rows matching every `keys[i] = values[i]`, joined with AND left to
    /// right.
    ///
    /// - `keys.len() != values.len()` → `DbError::ArityMismatch`, no query
    /// - empty `keys` → every row
    async fn search(&self, keys: &[FindWith], values: &[LookupValue]) -> DbResult<Vec<T>>;
}

/// Key/value store settings.
#[async_trait]
pub trait StorePrefRepository: Send + Sync {
    /// A single-entry map for `key`, or `DbError::NotFound`.
    async fn find(&self, key: &str) -> DbResult<StoreSetting>;

    async fn all(&self) -> DbResult<StoreSetting>;

    /// Sets `key` and returns the updated entry, or `DbError::NotFound`.
    async fn update(&self, key: &str, value: &str) -> DbResult<StoreSetting>;
}

/// Unix seconds, used for `created_at` / `updated_at`.
pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}
