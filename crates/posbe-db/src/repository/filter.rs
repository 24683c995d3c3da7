//! # Key → Condition Translation
//!
//! Each adapter maps a [`FindWith`] to a [`Filter`] with an exhaustive
//! `match`. A filter knows its column and comparison; the lookup value is
//! always bound as a parameter.
//!
//! ```text
//! Filter::Int("p.category_id")   →  p.category_id = ?
//! Filter::Text("p.sku")          →  p.sku = ?
//! Filter::Contains("u.name")     →  u.name LIKE '%' || ? || '%' ESCAPE '\'
//! Filter::Between("p.price")     →  p.price BETWEEN ? AND ?
//! ```

use std::slice;

use posbe_core::{FindWith, LookupValue};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Per-adapter key dispatch.
pub(crate) type Dispatch = fn(FindWith) -> DbResult<Filter>;

/// A single bound condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// `col = ?` with an integer value.
    Int(&'static str),
    /// `col = ?` with a text value.
    Text(&'static str),
    /// `col LIKE '%' || ? || '%'`. `%` and `_` in the value match
    /// themselves.
    Contains(&'static str),
    /// `col BETWEEN ? AND ?`, bounds taken as given.
    Between(&'static str),
}

impl Filter {
    /// Appends the condition, binding `value` for `key`.
    ///
    /// A value of the wrong shape fails here, before anything is executed.
    pub fn push(
        self,
        qb: &mut QueryBuilder<'static, Sqlite>,
        key: FindWith,
        value: &LookupValue,
    ) -> DbResult<()> {
        match self {
            Filter::Int(column) => {
                let value = value.as_int(key)?;
                qb.push(column).push(" = ").push_bind(value);
            }
            Filter::Text(column) => {
                let value = value.as_text(key)?.to_string();
                qb.push(column).push(" = ").push_bind(value);
            }
            Filter::Contains(column) => {
                let value = escape_like(value.as_text(key)?);
                qb.push(column)
                    .push(" LIKE '%' || ")
                    .push_bind(value)
                    .push(" || '%' ESCAPE '\\'");
            }
            Filter::Between(column) => {
                let (low, high) = value.as_range(key)?;
                qb.push(column)
                    .push(" BETWEEN ")
                    .push_bind(low)
                    .push(" AND ")
                    .push_bind(high);
            }
        }
        Ok(())
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Starts a query from `base` and appends `WHERE k1 AND k2 ...`.
///
/// Arity is checked first; a mismatch never produces a query.
pub(crate) fn select(
    base: &str,
    keys: &[FindWith],
    values: &[LookupValue],
    dispatch: Dispatch,
) -> DbResult<QueryBuilder<'static, Sqlite>> {
    if keys.len() != values.len() {
        return Err(DbError::ArityMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }

    let mut qb = QueryBuilder::new(base);
    for (i, (key, value)) in keys.iter().zip(values).enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        dispatch(*key)?.push(&mut qb, *key, value)?;
    }
    Ok(qb)
}

/// First row of `base` matching `key = value`, or `DbError::NotFound`.
pub(crate) async fn fetch_first<T>(
    pool: &SqlitePool,
    entity: &'static str,
    base: &str,
    key: FindWith,
    value: &LookupValue,
    dispatch: Dispatch,
) -> DbResult<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    debug!(entity, key = %key, value = %value, "Finding record");

    let mut qb = select(base, slice::from_ref(&key), slice::from_ref(value), dispatch)?;
    qb.push(" LIMIT 1");

    qb.build_query_as::<T>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found(entity, key, value))
}

/// Every row of `base` matching all `keys[i] = values[i]`, ordered by
/// `order_by`.
pub(crate) async fn fetch_matching<T>(
    pool: &SqlitePool,
    entity: &'static str,
    base: &str,
    keys: &[FindWith],
    values: &[LookupValue],
    order_by: &str,
    dispatch: Dispatch,
) -> DbResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut qb = select(base, keys, values, dispatch)?;
    qb.push(" ORDER BY ").push(order_by);

    let rows = qb.build_query_as::<T>().fetch_all(pool).await?;

    debug!(entity, conditions = keys.len(), count = rows.len(), "Fetched records");
    Ok(rows)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByName => Ok(Filter::Contains("name")),
            FindWith::BySku => Ok(Filter::Text("sku")),
            FindWith::ByPriceRange => Ok(Filter::Between("price")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId => Err(DbError::unsupported("Test", key)),
        }
    }

    #[test]
    fn test_conditions_are_bound_and_joined() {
        let qb = select(
            "SELECT * FROM products",
            &[FindWith::BySku, FindWith::ByPriceRange, FindWith::ByName],
            &["ESP'; DROP TABLE products; --".into(), [1.0, 2.0].into(), "latte".into()],
            dispatch,
        )
        .unwrap();

        assert_eq!(
            qb.sql(),
            "SELECT * FROM products WHERE sku = ? AND price BETWEEN ? AND ? \
             AND name LIKE '%' || ? || '%' ESCAPE '\\'"
        );
    }

    #[test]
    fn test_empty_keys_select_everything() {
        let qb = select("SELECT * FROM products", &[], &[], dispatch).unwrap();
        assert_eq!(qb.sql(), "SELECT * FROM products");
    }

    #[test]
    fn test_arity_mismatch() {
        let err = select("SELECT 1", &[FindWith::BySku], &[], dispatch).err().unwrap();
        assert!(matches!(err, DbError::ArityMismatch { keys: 1, values: 0 }));

        let err = select("SELECT 1", &[], &["ESP-01".into()], dispatch).err().unwrap();
        assert!(matches!(err, DbError::ArityMismatch { keys: 0, values: 1 }));
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("latte"), "latte");
    }

    #[test]
    fn test_unsupported_key() {
        let err = select("SELECT 1", &[FindWith::ByPhone], &["0800".into()], dispatch)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Test cannot be looked up by_phone");
    }

    #[test]
    fn test_wrong_value_shape() {
        let err = select("SELECT 1", &[FindWith::ById], &["seven".into()], dispatch)
            .err()
            .unwrap();
        assert!(matches!(err, DbError::InvalidLookup(_)));
    }
}
