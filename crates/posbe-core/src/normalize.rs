//! # Error Normalization
//!
//! Turns any backend error into a two-field [`ServiceError`] so services and
//! handlers never depend on backend error types.
//!
//! ## Two Buckets
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    normalize(err)                                       │
//! │                                                                         │
//! │  None ───────────────────────────────────────────► None                │
//! │                                                                         │
//! │  Some(err) where err.is_absence() ──────────────► NotFound (404)       │
//! │      (the backend's own "zero rows" sentinel)                          │
//! │                                                                         │
//! │  Some(err) otherwise ───────────────────────────► Internal (500)       │
//! │      (connection, constraint, decode, bad lookup value)                │
//! │                                                                         │
//! │  message = err.to_string(), never rewritten                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `ServiceError` is created once, at the backend/service boundary, and is
//! passed upward as-is.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;

// =============================================================================
// Absence
// =============================================================================

/// Implemented by backend errors that can signal "zero rows matched".
pub trait Absence {
    /// `true` only for the backend's not-found sentinel.
    fn is_absence(&self) -> bool;
}

// =============================================================================
// Error Code
// =============================================================================

/// HTTP-style status family of a [`ServiceError`].
///
/// The normalizer only produces `NotFound` and `Internal`; the other codes
/// are raised by services for business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    Unprocessable,
    Internal,
}

impl ErrorCode {
    /// The HTTP status this code maps to.
    pub const fn status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::Forbidden => 403,
            ErrorCode::Unprocessable => 422,
            ErrorCode::Internal => 500,
        }
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// The normalized error value object: `{code, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Classifies a backend error; the message is kept verbatim.
    pub fn from_backend<E>(err: &E) -> Self
    where
        E: Absence + Display + ?Sized,
    {
        let code = if err.is_absence() {
            ErrorCode::NotFound
        } else {
            ErrorCode::Internal
        };
        ServiceError::new(code, err.to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Forbidden, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Unprocessable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }

    /// HTTP status of this error.
    #[inline]
    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

impl Absence for ServiceError {
    fn is_absence(&self) -> bool {
        self.code == ErrorCode::NotFound
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::unprocessable(err.to_string())
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Normalizes an optional backend error. Total: `None` in, `None` out.
pub fn normalize<E>(err: Option<&E>) -> Option<ServiceError>
where
    E: Absence + Display + ?Sized,
{
    err.map(ServiceError::from_backend)
}

/// Normalizes the result of a single-row repository call.
pub fn validate_row<T, E>(result: Result<T, E>) -> Result<T, ServiceError>
where
    E: Absence + Display,
{
    result.map_err(|err| ServiceError::from_backend(&err))
}

/// Normalizes the result of a multi-row repository call.
pub fn validate_rows<T, E>(result: Result<Vec<T>, E>) -> Result<Vec<T>, ServiceError>
where
    E: Absence + Display,
{
    result.map_err(|err| ServiceError::from_backend(&err))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    enum FakeBackendError {
        #[error("no rows in result set")]
        NoRows,
        #[error("{0}")]
        Other(String),
    }

    impl Absence for FakeBackendError {
        fn is_absence(&self) -> bool {
            matches!(self, FakeBackendError::NoRows)
        }
    }

    #[test]
    fn test_none_normalizes_to_none() {
        assert_eq!(normalize::<FakeBackendError>(None), None);
    }

    #[test]
    fn test_absence_maps_to_not_found() {
        let err = normalize(Some(&FakeBackendError::NoRows)).unwrap();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.status(), 404);
        assert_eq!(err.message, "no rows in result set");
    }

    #[test]
    fn test_failure_keeps_backend_message() {
        let err = normalize(Some(&FakeBackendError::Other("LOREM".to_string()))).unwrap();
        assert_eq!(err, ServiceError::internal("LOREM"));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_validate_row() {
        let ok: Result<i64, FakeBackendError> = Ok(1);
        assert_eq!(validate_row(ok), Ok(1));

        let failed: Result<i64, FakeBackendError> = Err(FakeBackendError::Other("LOREM".into()));
        assert_eq!(validate_row(failed), Err(ServiceError::internal("LOREM")));
    }

    #[test]
    fn test_validate_rows() {
        let ok: Result<Vec<&str>, FakeBackendError> = Ok(vec!["ipsum", "lorem"]);
        assert_eq!(validate_rows(ok), Ok(vec!["ipsum", "lorem"]));

        let missing: Result<Vec<&str>, FakeBackendError> = Err(FakeBackendError::NoRows);
        assert!(validate_rows(missing).unwrap_err().is_absence());
    }

    #[test]
    fn test_validation_error_is_unprocessable() {
        let err: ServiceError = ValidationError::Required {
            field: "name".into(),
        }
        .into();
        assert_eq!(err.status(), 422);
    }
}
