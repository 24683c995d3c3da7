//! # Product Repositories
//!
//! Products and their variants.
//!
//! ## Multi-Key Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Product Search Works                             │
//! │                                                                         │
//! │  keys   = [ByCategoryId, ByPriceRange]                                 │
//! │  values = [3,            [10.0, 20.0]]                                 │
//! │       │                                                                 │
//! │       ▼  (len check first: 2 == 2)                                      │
//! │  SELECT ... FROM products                                              │
//! │   WHERE category_id = ?1                                               │
//! │     AND price BETWEEN ?2 AND ?3                                        │
//! │   ORDER BY id                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────┐                          │
//! │  │ LATTE-M  | cat 3 | 15.0 │ ← MATCH        │                          │
//! │  │ MOCHA-M  | cat 3 | 18.0 │ ← MATCH        │                          │
//! │  │ MOCHA-XL | cat 3 | 25.0 │   price > 20   │                          │
//! │  │ GREEN-M  | cat 2 | 12.0 │   category 2   │                          │
//! │  └──────────────────────────────────────────┘                          │
//! │                                                                         │
//! │  No keys → every product. Inverted range → nothing (BETWEEN as given). │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use posbe_core::{Entity, FindWith, LookupValue, Product, ProductVariant};
use sqlx::SqlitePool;
use tracing::debug;

use super::filter::{fetch_first, fetch_matching, Filter};
use super::{CrudRepository, CrudSearchRepository, CrudWhereRepository};
use crate::error::{DbError, DbResult};

// =============================================================================
// Product
// =============================================================================

const SELECT_PRODUCT: &str = "SELECT id, category_id, subcategory_id, sku, image, gallery, \
     name, description, price FROM products";

const PRODUCT_COLUMNS: &str =
    "id, category_id, subcategory_id, sku, image, gallery, name, description, price";

/// SQLite adapter for [`Product`].
///
/// `find` returns the product with its variants; `all` and `search` return
/// bare rows.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Keys `find` accepts: identity, SKU and a name fragment.
    fn find_filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::BySku => Ok(Filter::Text("sku")),
            FindWith::ByName => Ok(Filter::Contains("name")),
            FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange
            | FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone => Err(DbError::unsupported(Product::KIND, key)),
        }
    }

    /// Keys `search` accepts.
    fn search_filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::BySku => Ok(Filter::Text("sku")),
            FindWith::ByCategoryId => Ok(Filter::Int("category_id")),
            FindWith::BySubcategoryId => Ok(Filter::Int("subcategory_id")),
            FindWith::ByPriceRange => Ok(Filter::Between("price")),
            FindWith::ById
            | FindWith::ByName
            | FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone => Err(DbError::unsupported(Product::KIND, key)),
        }
    }

    async fn variants_of(&self, product_id: i64) -> DbResult<Vec<ProductVariant>> {
        fetch_matching(
            &self.pool,
            ProductVariant::KIND,
            SELECT_VARIANT,
            &[FindWith::ByRelationId],
            &[product_id.into()],
            "id",
            ProductVariantRepository::filter,
        )
        .await
    }

    /// Total number of products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CrudRepository<Product> for ProductRepository {
    async fn all(&self) -> DbResult<Vec<Product>> {
        fetch_matching(&self.pool, Product::KIND, SELECT_PRODUCT, &[], &[], "id", Self::search_filter)
            .await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Product> {
        let mut product: Product =
            fetch_first(&self.pool, Product::KIND, SELECT_PRODUCT, key, &value, Self::find_filter)
                .await?;
        product.variants = self.variants_of(product.id).await?;
        Ok(product)
    }

    async fn create(&self, data: &Product) -> DbResult<Product> {
        debug!(sku = %data.sku, "Inserting product");

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (category_id, subcategory_id, sku, image, gallery, \
             name, description, price) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(data.category_id)
        .bind(data.subcategory_id)
        .bind(&data.sku)
        .bind(&data.image)
        .bind(&data.gallery)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    async fn update(&self, data: &Product) -> DbResult<Product> {
        debug!(id = data.id, sku = %data.sku, "Updating product");

        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET category_id = ?1, subcategory_id = ?2, sku = ?3, \
             image = ?4, gallery = ?5, name = ?6, description = ?7, price = ?8 \
             WHERE id = ?9 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(data.category_id)
        .bind(data.subcategory_id)
        .bind(&data.sku)
        .bind(&data.image)
        .bind(&data.gallery)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Product::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Product) -> DbResult<()> {
        debug!(id = data.id, "Deleting product");

        // variants go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CrudSearchRepository<Product> for ProductRepository {
    async fn search(&self, keys: &[FindWith], values: &[LookupValue]) -> DbResult<Vec<Product>> {
        debug!(keys = ?keys, "Searching products");
        fetch_matching(&self.pool, Product::KIND, SELECT_PRODUCT, keys, values, "id", Self::search_filter)
            .await
    }
}

// =============================================================================
// Product Variant
// =============================================================================

const SELECT_VARIANT: &str = "SELECT id, product_id, unit_id, unit_size, type, name, \
     description, price FROM product_variants";

const VARIANT_COLUMNS: &str = "id, product_id, unit_id, unit_size, type, name, description, price";

/// SQLite adapter for [`ProductVariant`]. `ByRelationId` is the product id.
#[derive(Debug, Clone)]
pub struct ProductVariantRepository {
    pool: SqlitePool,
}

impl ProductVariantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductVariantRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByRelationId => Ok(Filter::Int("product_id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByPriceRange => Ok(Filter::Between("price")),
            FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId => Err(DbError::unsupported(ProductVariant::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<ProductVariant> for ProductVariantRepository {
    async fn all(&self) -> DbResult<Vec<ProductVariant>> {
        fetch_matching(
            &self.pool,
            ProductVariant::KIND,
            SELECT_VARIANT,
            &[],
            &[],
            "id",
            Self::filter,
        )
        .await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<ProductVariant> {
        fetch_first(&self.pool, ProductVariant::KIND, SELECT_VARIANT, key, &value, Self::filter)
            .await
    }

    async fn create(&self, data: &ProductVariant) -> DbResult<ProductVariant> {
        debug!(product_id = data.product_id, name = %data.name, "Inserting product variant");

        let variant = sqlx::query_as::<_, ProductVariant>(&format!(
            "INSERT INTO product_variants (product_id, unit_id, unit_size, type, name, \
             description, price) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING {VARIANT_COLUMNS}"
        ))
        .bind(data.product_id)
        .bind(data.unit_id)
        .bind(data.unit_size)
        .bind(&data.kind)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(variant)
    }

    async fn update(&self, data: &ProductVariant) -> DbResult<ProductVariant> {
        debug!(id = data.id, "Updating product variant");

        sqlx::query_as::<_, ProductVariant>(&format!(
            "UPDATE product_variants SET product_id = ?1, unit_id = ?2, unit_size = ?3, \
             type = ?4, name = ?5, description = ?6, price = ?7 WHERE id = ?8 \
             RETURNING {VARIANT_COLUMNS}"
        ))
        .bind(data.product_id)
        .bind(data.unit_id)
        .bind(data.unit_size)
        .bind(&data.kind)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(ProductVariant::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &ProductVariant) -> DbResult<()> {
        debug!(id = data.id, "Deleting product variant");

        sqlx::query("DELETE FROM product_variants WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CrudWhereRepository<ProductVariant> for ProductVariantRepository {
    async fn all_where(&self, key: FindWith, value: LookupValue) -> DbResult<Vec<ProductVariant>> {
        fetch_matching(
            &self.pool,
            ProductVariant::KIND,
            SELECT_VARIANT,
            &[key],
            &[value],
            "id",
            Self::filter,
        )
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use posbe_core::{Absence, Category, Subcategory, Unit};

    /// Three categories with one subcategory each, one unit.
    async fn setup() -> (Database, Vec<Subcategory>, Unit) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut subcategories = Vec::new();
        for name in ["Food", "Tea", "Coffee"] {
            let category = db
                .categories()
                .create(&Category {
                    name: name.into(),
                    ..Default::default()
                })
                .await
                .unwrap();
            let subcategory = db
                .subcategories()
                .create(&Subcategory {
                    id: 0,
                    category_id: category.id,
                    name: format!("{name} - regular"),
                })
                .await
                .unwrap();
            subcategories.push(subcategory);
        }

        let unit = db
            .units()
            .create(&Unit {
                id: 0,
                magnitude: "volume".into(),
                name: "millilitre".into(),
                symbol: "ml".into(),
            })
            .await
            .unwrap();

        (db, subcategories, unit)
    }

    fn product(subcategory: &Subcategory, sku: &str, price: f64) -> Product {
        Product {
            category_id: subcategory.category_id,
            subcategory_id: subcategory.id,
            sku: sku.into(),
            name: sku.to_lowercase(),
            price,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_category_and_price_range() {
        let (db, subs, _) = setup().await;
        let repo = db.products();
        for (sub, sku, price) in [
            (&subs[2], "LATTE-M", 15.0),
            (&subs[2], "MOCHA-M", 18.0),
            (&subs[2], "MOCHA-XL", 25.0),
            (&subs[1], "GREEN-M", 12.0),
            (&subs[0], "TOAST", 10.0),
        ] {
            repo.create(&product(sub, sku, price)).await.unwrap();
        }

        let coffee = subs[2].category_id;
        let found = repo
            .search(
                &[FindWith::ByCategoryId, FindWith::ByPriceRange],
                &[coffee.into(), [10.0, 20.0].into()],
            )
            .await
            .unwrap();

        let skus: Vec<_> = found.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, ["LATTE-M", "MOCHA-M"]);
    }

    #[tokio::test]
    async fn test_search_edge_cases() {
        let (db, subs, _) = setup().await;
        let repo = db.products();
        repo.create(&product(&subs[0], "TOAST", 10.0)).await.unwrap();
        repo.create(&product(&subs[1], "GREEN-M", 12.0)).await.unwrap();

        // no keys: every row
        assert_eq!(repo.search(&[], &[]).await.unwrap().len(), 2);

        // inverted range: passed through, matches nothing
        let none = repo
            .search(&[FindWith::ByPriceRange], &[(20.0, 10.0).into()])
            .await
            .unwrap();
        assert!(none.is_empty());

        // arity mismatch: failure, not absence
        let err = repo
            .search(&[FindWith::BySku, FindWith::ByCategoryId], &["TOAST".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ArityMismatch { keys: 2, values: 1 }));
        assert!(!err.is_absence());

        // list range with three bounds
        let err = repo
            .search(&[FindWith::ByPriceRange], &[vec![1.0, 2.0, 3.0].into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidLookup(_)));

        // values without keys
        let err = repo.search(&[], &["TOAST".into()]).await.unwrap_err();
        assert!(matches!(err, DbError::ArityMismatch { keys: 0, values: 1 }));
    }

    #[tokio::test]
    async fn test_find_and_search_keys_are_disjoint() {
        let (db, subs, _) = setup().await;
        let repo = db.products();
        let toast = repo.create(&product(&subs[0], "TOAST", 10.0)).await.unwrap();

        let by_sku = repo.find(FindWith::BySku, "TOAST".into()).await.unwrap();
        assert_eq!(by_sku.id, toast.id);
        let by_sku = repo.search(&[FindWith::BySku], &["TOAST".into()]).await.unwrap();
        assert_eq!(by_sku.len(), 1);

        let err = repo
            .find(FindWith::ByCategoryId, toast.category_id.into())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UnsupportedKey { key: FindWith::ByCategoryId, .. }));

        let err = repo.search(&[FindWith::ById], &[toast.id.into()]).await.unwrap_err();
        assert!(matches!(err, DbError::UnsupportedKey { key: FindWith::ById, .. }));

        let err = repo.search(&[FindWith::ByName], &["toast".into()]).await.unwrap_err();
        assert!(!err.is_absence());
    }

    #[tokio::test]
    async fn test_name_wildcards_match_literally() {
        let (db, subs, _) = setup().await;
        let repo = db.products();
        repo.create(&product(&subs[0], "TOAST", 10.0)).await.unwrap();
        let promo = repo.create(&product(&subs[0], "50%_OFF", 5.0)).await.unwrap();

        let found = repo.find(FindWith::ByName, "%".into()).await.unwrap();
        assert_eq!(found.id, promo.id);
        let found = repo.find(FindWith::ByName, "%_".into()).await.unwrap();
        assert_eq!(found.id, promo.id);

        let err = repo.find(FindWith::ByName, "t_ast".into()).await.unwrap_err();
        assert!(err.is_absence());
    }

    #[tokio::test]
    async fn test_find_loads_variants_and_delete_cascades() {
        let (db, subs, unit) = setup().await;
        let latte = db
            .products()
            .create(&product(&subs[2], "LATTE", 15.0))
            .await
            .unwrap();

        for (name, size) in [("Medium", 350.0), ("Large", 500.0)] {
            db.product_variants()
                .create(&ProductVariant {
                    product_id: latte.id,
                    unit_id: unit.id,
                    unit_size: size,
                    kind: "size".into(),
                    name: name.into(),
                    price: size / 25.0,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let found = db.products().find(FindWith::BySku, "LATTE".into()).await.unwrap();
        assert_eq!(found.variants.len(), 2);
        assert_eq!(found.variants[1].kind, "size");

        db.products().delete(&found).await.unwrap();
        let orphans = db
            .product_variants()
            .all_where(FindWith::ByRelationId, latte.id.into())
            .await
            .unwrap();
        assert!(orphans.is_empty());
    }

    #[tokio::test]
    async fn test_find_missing_product_is_absence() {
        let (db, _, _) = setup().await;
        let err = db.products().find(FindWith::ById, 7.into()).await.unwrap_err();
        assert!(err.is_absence());

        let err = db.products().find(FindWith::ByPhone, "0800".into()).await.unwrap_err();
        assert!(!err.is_absence());
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let (db, subs, _) = setup().await;
        db.products().create(&product(&subs[0], "TOAST", 10.0)).await.unwrap();
        let err = db
            .products()
            .create(&product(&subs[0], "TOAST", 11.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field } if field == "products.sku"));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }
}
