//! # Repository Errors
//!
//! ```text
//!   sqlx::Error ─┐
//!   LookupError ─┼──► DbError ──► posbe_core::normalize ──► ServiceError
//!   MigrateError ┘       │
//!                        └─ NotFound  ─► NotFound (404)
//!                           otherwise ─► Internal (500), message verbatim
//! ```

use posbe_core::{Absence, FindWith, LookupError};
use thiserror::Error;

/// Everything a repository call can fail with. Only [`DbError::NotFound`]
/// means "no such row".
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched.
    ///
    /// ## When This Occurs
    /// - `find` matched zero rows
    /// - `update` targeted an id that does not exist
    #[error("{entity} not found: {key} = {value}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
    },

    /// A second row with the same SKU, username, role name, etc.
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// ## When This Occurs
    /// - A row points at a category_id / floor_id / role_id that is gone
    /// - Deleting a unit that a product variant still uses
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The lookup value does not fit the key (e.g. text for `ById`).
    ///
    /// ## When This Occurs
    /// - Raised while binding, before the query is sent
    #[error(transparent)]
    InvalidLookup(#[from] LookupError),

    /// The adapter does not support this key.
    #[error("{entity} cannot be looked up {key}")]
    UnsupportedKey { entity: &'static str, key: FindWith },

    /// `search` received a different number of keys and values.
    ///
    /// ## When This Occurs
    /// - Always before any query is issued
    #[error("search expects one value per key: got {keys} keys and {values} values")]
    ArityMismatch { keys: usize, values: usize },

    /// The file could not be opened, or the pool is already closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed. Carries the backend message verbatim.
    #[error("{0}")]
    QueryFailed(String),

    /// No connection freed up within `acquire_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Any other backend error. Carries the backend message verbatim.
    #[error("{0}")]
    Internal(String),
}

impl DbError {
    /// `entity` looked up by `key = value` matched nothing.
    pub fn not_found(
        entity: impl Into<String>,
        key: impl ToString,
        value: impl ToString,
    ) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn unsupported(entity: &'static str, key: FindWith) -> Self {
        DbError::UnsupportedKey { entity, key }
    }
}

impl Absence for DbError {
    fn is_absence(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Constraint failures are recognised from SQLite's message text; any
/// other database error keeps its message as `QueryFailed`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                key: "row".to_string(),
                value: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use posbe_core::{normalize, ErrorCode, LookupValue};

    #[test]
    fn test_only_not_found_is_absence() {
        assert!(DbError::not_found("Product", FindWith::BySku, "ESP-01").is_absence());
        assert!(DbError::from(sqlx::Error::RowNotFound).is_absence());

        assert!(!DbError::PoolExhausted.is_absence());
        assert!(!DbError::QueryFailed("LOREM".into()).is_absence());
        assert!(!DbError::ArityMismatch { keys: 2, values: 1 }.is_absence());
        assert!(!DbError::from(sqlx::Error::PoolClosed).is_absence());
    }

    #[test]
    fn test_invalid_lookup_is_failure() {
        let err: DbError = LookupValue::from("seven")
            .as_int(FindWith::ById)
            .unwrap_err()
            .into();
        let normalized = normalize(Some(&err)).unwrap();
        assert_eq!(normalized.code, ErrorCode::Internal);
        assert_eq!(normalized.message, "by_id expects integer lookup value, got text");
    }

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = DbError::QueryFailed("LOREM".into());
        assert_eq!(err.to_string(), "LOREM");
    }

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Category", FindWith::ById, 7);
        assert_eq!(err.to_string(), "Category not found: by_id = 7");
    }
}
