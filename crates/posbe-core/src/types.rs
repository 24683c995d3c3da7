//! # Domain Types
//!
//! Records of the back office: accounts, catalog and store layout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Account              Catalog                    Store layout           │
//! │  ┌──────────┐         ┌──────────┐  ┌─────────┐  ┌──────────┐           │
//! │  │   Role   │◄──┐     │ Category │◄─┤ Product │  │  Floor   │           │
//! │  │  usage*  │   │     │  └ Sub-  │  │  sku    │  │ totals*  │           │
//! │  └──────────┘   │     │  category│  │  price  │  └────┬─────┘           │
//! │  ┌──────────┐   │     └──────────┘  └────┬────┘       │ floor_id        │
//! │  │   User   │───┘     ┌──────────┐  ┌────▼────┐  ┌────▼─────┐ ┌──────┐  │
//! │  │ password │         │   Unit   │◄─┤ Variant │  │  Table   │ │ Room │  │
//! │  └──────────┘         └──────────┘  └─────────┘  └──────────┘ └──────┘  │
//! │                       ┌──────────┐               ┌──────────────────┐   │
//! │                       │  Addon   │               │ StorePref (k, v) │   │
//! │                       └──────────┘               └──────────────────┘   │
//! │                                                                         │
//! │  * computed by the adapter, never written                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record except `StorePref` carries an `i64` id assigned by the
//! backend on create. A zero id means "not yet created".
//!
//! Timestamps are unix seconds, `None` until the backend sets them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::Entity;

// =============================================================================
// Account
// =============================================================================

/// A named permission group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// Number of users holding this role.
    #[serde(default)]
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub usage: i64,
}

impl Role {
    /// A role held by at least one user cannot be deleted.
    #[inline]
    pub fn in_use(&self) -> bool {
        self.usage >= 1
    }
}

/// A back-office account, always returned with its role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub role_id: i64,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Password hash. Empty when stripped, and then never serialized.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default)]
    pub role: Role,
}

impl User {
    /// Drops the password hash before the record leaves the service layer.
    pub fn without_password(mut self) -> Self {
        self.password.clear();
        self
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A unit of measure, e.g. `mass / kilogram / kg`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Unit {
    pub id: i64,
    pub magnitude: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

/// An extra that can be attached to an order line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Addon {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// A sellable product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub subcategory_id: i64,

    /// Stock Keeping Unit, unique per store.
    pub sku: String,

    pub image: Option<String>,
    pub gallery: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,

    /// Sizes/flavours sold under this product. Filled on detail reads and
    /// used as input by `add_product`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub unit_id: i64,
    pub unit_size: f64,

    /// Free-form variant type ("size", "flavour", ...).
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    #[ts(rename = "type")]
    pub kind: String,

    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

// =============================================================================
// Store Layout
// =============================================================================

/// A floor of the venue, holding tables (dine-in) and/or rooms (karaoke).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Floor {
    pub id: i64,
    pub name: String,

    #[serde(default)]
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub total_tables: i64,

    #[serde(default)]
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub total_rooms: i64,

    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub tables: Vec<Table>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Table {
    pub id: i64,
    pub floor_id: i64,
    pub name: String,
    pub x_pos: f64,
    pub y_pos: f64,
    pub w_size: f64,
    pub h_size: f64,
    pub capacity: i64,

    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    #[ts(rename = "type")]
    pub kind: String,

    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Room {
    pub id: i64,
    pub floor_id: i64,
    pub name: String,
    pub x_pos: f64,
    pub y_pos: f64,
    pub w_size: f64,
    pub h_size: f64,
    pub capacity: i64,
    pub price: f64,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// Which layout `floors_with` populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum FloorLayout {
    Tables,
    Rooms,
}

// =============================================================================
// Store Preferences
// =============================================================================

/// One row of the key/value settings table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StorePref {
    pub key: String,
    pub value: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// Store settings as returned to callers: `key → value`.
pub type StoreSetting = BTreeMap<String, String>;

// =============================================================================
// Entity Impls
// =============================================================================

macro_rules! impl_entity {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Entity for $ty {
                const KIND: &'static str = stringify!($ty);

                #[inline]
                fn id(&self) -> i64 {
                    self.id
                }
            }
        )*
    };
}

impl_entity!(
    Role,
    User,
    Unit,
    Category,
    Subcategory,
    Addon,
    Product,
    ProductVariant,
    Floor,
    Table,
    Room,
);

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_in_use() {
        let mut role = Role {
            id: 1,
            name: "admin".into(),
            description: "full access".into(),
            usage: 0,
        };
        assert!(!role.in_use());
        role.usage = 1;
        assert!(role.in_use());
    }

    #[test]
    fn test_stripped_password_is_not_serialized() {
        let user = User {
            id: 1,
            username: "cashier".into(),
            password: "$argon2id$...".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_some());

        let json = serde_json::to_value(user.without_password()).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_variant_type_field_name() {
        let variant = ProductVariant {
            kind: "size".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["type"], "size");
    }

    #[test]
    fn test_entity_kind() {
        assert_eq!(Product::KIND, "Product");
        assert_eq!(ProductVariant::KIND, "ProductVariant");
        assert_eq!(Floor { id: 9, ..Default::default() }.id(), 9);
    }
}
