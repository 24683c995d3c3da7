//! # posbe-db
//!
//! Where rows live. Four kinds of repository contract sit over SQLite, and
//! `Database` owns the pool behind them.
//!
//! ```text
//!   posbe-service ── CrudRepository<Role> ──────────┐
//!                 ── CrudWhereRepository<Table> ────┤   repository/*.rs
//!                 ── CrudSearchRepository<Product> ─┤   (SQLite adapters)
//!                 ── StorePrefRepository ───────────┘
//!                                                   │
//!                        Database (pool.rs) ◄───────┘
//!                            │   SqlitePool, WAL, foreign keys on
//!                            ▼
//!                        posbe.db ◄── migrations/sqlite/*.sql (embedded)
//! ```
//!
//! A failed call returns [`DbError`]. `NotFound` is the only "no such row"
//! answer; services turn it into 404, everything else into 500.
//!
//! ```rust,ignore
//! use posbe_core::FindWith;
//! use posbe_db::{CrudRepository, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("posbe.db")).await?;
//! let latte = db.products().find(FindWith::BySku, "LATTE-M".into()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

pub use repository::{
    CrudRepository, CrudSearchRepository, CrudWhereRepository, StorePrefRepository,
};
