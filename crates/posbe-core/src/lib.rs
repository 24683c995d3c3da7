//! # posbe-core: Pure Types for the Posbe Data Layer
//!
//! Everything the repositories, the cache and the services agree on, with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Posbe Data Flow                                  │
//! │                                                                         │
//! │  Service (role_list, delete_product, ...)                              │
//! │       │                                                                 │
//! │       │  FindWith::ById + LookupValue::Int(7)                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ posbe-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │    find    │  │ normalize  │  │validation│  │   │
//! │  │   │  Product  │  │  FindWith  │  │ServiceError│  │  rules   │  │   │
//! │  │   │   Role    │  │LookupValue │  │  Absence   │  │  checks  │  │   │
//! │  │   └───────────┘  └────────────┘  └────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CACHE STORE • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  posbe-db (SQLite adapters)   posbe-cache (read-through cache)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Role, User, Product, Floor, ...)
//! - [`find`] - The closed set of lookup keys and their payloads
//! - [`normalize`] - Two-bucket error normalization (absence vs failure)
//! - [`error`] - Lookup and validation errors
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use posbe_core::{FindWith, LookupValue};
//!
//! let value = LookupValue::from([10.0, 20.0]);
//! assert_eq!(value.as_range(FindWith::ByPriceRange).unwrap(), (10.0, 20.0));
//! assert!(value.as_int(FindWith::ById).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod find;
pub mod normalize;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{LookupError, ValidationError};
pub use find::{FindWith, LookupValue};
pub use normalize::{normalize, validate_row, validate_rows, Absence, ErrorCode, ServiceError};
pub use types::*;

// =============================================================================
// Entity Identity
// =============================================================================

/// A record with a unique integer identity.
///
/// Repositories are generic over their entity; this is the only thing the
/// data layer needs to know about a record beyond its column mapping.
pub trait Entity {
    /// Human-readable entity name used in error messages ("Product", "Role").
    const KIND: &'static str;

    /// The backend-assigned identity (0 before the record is created).
    fn id(&self) -> i64;
}
