//! # Lookup Keys
//!
//! The closed set of keys a caller can filter on, and the values paired with
//! them at call time.
//!
//! ## Why a Closed Enum?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Key → Column Dispatch                                │
//! │                                                                         │
//! │  Caller:  repo.find(FindWith::BySku, "ESP-01".into())                  │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  Adapter: match key {                                                  │
//! │               FindWith::BySku  => Filter::Text("sku"),                 │
//! │               FindWith::ById   => Filter::Int("id"),                   │
//! │               FindWith::ByPhone => Err(UnsupportedKey),  ← explicit    │
//! │           }                                                            │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  SQL:     SELECT ... WHERE sku = ?1      (value is always bound)       │
//! │                                                                         │
//! │  Callers never build SQL; adapters never see caller-supplied columns.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

// =============================================================================
// FindWith
// =============================================================================

/// Symbolic lookup key. Carries no value; it only selects the column and
/// comparison an adapter applies.
///
/// Adding a variant breaks every adapter's exhaustive `match` until it
/// either handles or explicitly rejects the new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindWith {
    ById,
    ByRelationId,
    ByName,
    // user data
    ByUsername,
    ByEmail,
    ByPhone,
    // product data
    BySku,
    ByCategoryId,
    BySubcategoryId,
    ByPriceRange,
}

impl FindWith {
    /// Every key, in declaration order.
    pub const ALL: [FindWith; 10] = [
        FindWith::ById,
        FindWith::ByRelationId,
        FindWith::ByName,
        FindWith::ByUsername,
        FindWith::ByEmail,
        FindWith::ByPhone,
        FindWith::BySku,
        FindWith::ByCategoryId,
        FindWith::BySubcategoryId,
        FindWith::ByPriceRange,
    ];

    /// Stable snake_case name, used in logs and error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FindWith::ById => "by_id",
            FindWith::ByRelationId => "by_relation_id",
            FindWith::ByName => "by_name",
            FindWith::ByUsername => "by_username",
            FindWith::ByEmail => "by_email",
            FindWith::ByPhone => "by_phone",
            FindWith::BySku => "by_sku",
            FindWith::ByCategoryId => "by_category_id",
            FindWith::BySubcategoryId => "by_subcategory_id",
            FindWith::ByPriceRange => "by_price_range",
        }
    }
}

impl fmt::Display for FindWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LookupValue
// =============================================================================

/// The payload paired with a [`FindWith`] key.
///
/// The concrete shape must match what the adapter expects for the key
/// (integer for `ById`, two bounds for `ByPriceRange`, ...). A mismatch is a
/// caller error surfaced when the adapter binds the value, not at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupValue {
    Int(i64),
    Text(String),
    Range(f64, f64),
    Numbers(Vec<f64>),
}

impl LookupValue {
    /// Short name of the payload shape, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            LookupValue::Int(_) => "integer",
            LookupValue::Text(_) => "text",
            LookupValue::Range(_, _) => "range",
            LookupValue::Numbers(_) => "number list",
        }
    }

    /// Reads the value as an integer.
    pub fn as_int(&self, key: FindWith) -> Result<i64, LookupError> {
        match self {
            LookupValue::Int(value) => Ok(*value),
            other => Err(LookupError::mismatch(key, "integer", other)),
        }
    }

    /// Reads the value as text.
    pub fn as_text(&self, key: FindWith) -> Result<&str, LookupError> {
        match self {
            LookupValue::Text(value) => Ok(value),
            other => Err(LookupError::mismatch(key, "text", other)),
        }
    }

    /// Reads the value as a `(low, high)` pair.
    ///
    /// Accepts `Range` or a `Numbers` list of exactly two elements. The
    /// bounds are returned as given: `low > high` is not normalized.
    pub fn as_range(&self, key: FindWith) -> Result<(f64, f64), LookupError> {
        match self {
            LookupValue::Range(low, high) => Ok((*low, *high)),
            LookupValue::Numbers(bounds) => match bounds.as_slice() {
                [low, high] => Ok((*low, *high)),
                _ => Err(LookupError::RangeArity {
                    key,
                    len: bounds.len(),
                }),
            },
            other => Err(LookupError::mismatch(key, "range", other)),
        }
    }
}

impl From<i64> for LookupValue {
    fn from(value: i64) -> Self {
        LookupValue::Int(value)
    }
}

impl From<i32> for LookupValue {
    fn from(value: i32) -> Self {
        LookupValue::Int(i64::from(value))
    }
}

impl From<&str> for LookupValue {
    fn from(value: &str) -> Self {
        LookupValue::Text(value.to_string())
    }
}

impl From<String> for LookupValue {
    fn from(value: String) -> Self {
        LookupValue::Text(value)
    }
}

impl From<(f64, f64)> for LookupValue {
    fn from((low, high): (f64, f64)) -> Self {
        LookupValue::Range(low, high)
    }
}

impl From<[f64; 2]> for LookupValue {
    fn from([low, high]: [f64; 2]) -> Self {
        LookupValue::Range(low, high)
    }
}

impl From<Vec<f64>> for LookupValue {
    fn from(values: Vec<f64>) -> Self {
        LookupValue::Numbers(values)
    }
}

impl fmt::Display for LookupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupValue::Int(value) => write!(f, "{value}"),
            LookupValue::Text(value) => write!(f, "{value}"),
            LookupValue::Range(low, high) => write!(f, "[{low}, {high}]"),
            LookupValue::Numbers(values) => write!(f, "{values:?}"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_lookup() {
        let value = LookupValue::from(42);
        assert_eq!(value.as_int(FindWith::ById).unwrap(), 42);
        assert!(value.as_text(FindWith::ByName).is_err());
    }

    #[test]
    fn test_text_lookup_rejects_int_key() {
        let value = LookupValue::from("espresso");
        let err = value.as_int(FindWith::ById).unwrap_err();
        assert_eq!(
            err.to_string(),
            "by_id expects integer lookup value, got text"
        );
    }

    #[test]
    fn test_range_from_list_requires_two_bounds() {
        assert_eq!(
            LookupValue::from(vec![1.0, 2.0])
                .as_range(FindWith::ByPriceRange)
                .unwrap(),
            (1.0, 2.0)
        );

        for bad in [vec![], vec![1.0], vec![1.0, 2.0, 3.0]] {
            let err = LookupValue::from(bad.clone())
                .as_range(FindWith::ByPriceRange)
                .unwrap_err();
            assert!(matches!(err, LookupError::RangeArity { len, .. } if len == bad.len()));
        }
    }

    #[test]
    fn test_inverted_range_is_passed_through() {
        let value = LookupValue::from((20.0, 10.0));
        assert_eq!(value.as_range(FindWith::ByPriceRange).unwrap(), (20.0, 10.0));
    }

    #[test]
    fn test_key_names_are_unique() {
        let mut names: Vec<_> = FindWith::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FindWith::ALL.len());
    }
}
