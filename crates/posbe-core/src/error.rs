//! # Error Types
//!
//! Domain-specific error types for posbe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  posbe-core errors (this file)                                         │
//! │  ├── LookupError      - Lookup value does not fit its key              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  posbe-db errors (separate crate)                                      │
//! │  └── DbError          - Backend failures + absence (NotFound)          │
//! │                                                                         │
//! │  posbe-core normalize.rs                                               │
//! │  └── ServiceError     - {code, message}, what callers see              │
//! │                                                                         │
//! │  Flow: LookupError → DbError → ServiceError → HTTP layer               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::find::{FindWith, LookupValue};

// =============================================================================
// Lookup Error
// =============================================================================

/// A lookup value whose shape does not match its key.
///
/// Raised when the adapter binds the value, before any query is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Wrong payload type for the key (e.g. text for `ById`).
    #[error("{key} expects {expected} lookup value, got {found}")]
    Mismatch {
        key: FindWith,
        expected: &'static str,
        found: &'static str,
    },

    /// A range given as a list with anything but two bounds.
    #[error("{key} expects exactly two bounds, got {len}")]
    RangeArity { key: FindWith, len: usize },
}

impl LookupError {
    pub(crate) fn mismatch(key: FindWith, expected: &'static str, found: &LookupValue) -> Self {
        LookupError::Mismatch {
            key,
            expected,
            found: found.kind(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A write payload was rejected before reaching a repository.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Empty or whitespace only.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid SKU characters, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================
