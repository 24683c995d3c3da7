//! # Catalog Product Service
//!
//! Products and their variants. Product reads are not cached: the list is
//! large and changes with every price edit.
//!
//! ## Search
//! ```text
//! product_search([ByCategoryId, ByPriceRange], [3, [10.0, 20.0]])
//!        │
//!        ▼
//! WHERE category_id = ? AND price BETWEEN ? AND ?
//! ```
//! Keys and values are handed to the repository unchanged: an arity
//! mismatch or a malformed range comes back as `Internal`, and an inverted
//! range simply matches nothing.

use std::sync::Arc;

use posbe_core::validation::{validate_name, validate_price, validate_reference, validate_sku};
use posbe_core::{
    validate_row, validate_rows, FindWith, LookupValue, Product, ProductVariant, ServiceError,
};
use posbe_db::{CrudRepository, CrudSearchRepository, CrudWhereRepository, Database};
use tracing::warn;

use crate::{find_by_id, find_then_delete};

#[derive(Clone)]
pub struct CatalogProductService {
    products: Arc<dyn CrudSearchRepository<Product>>,
    variants: Arc<dyn CrudWhereRepository<ProductVariant>>,
}

impl CatalogProductService {
    pub fn new(db: &Database) -> Self {
        CatalogProductService {
            products: Arc::new(db.products()),
            variants: Arc::new(db.product_variants()),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn product_search(
        &self,
        keys: &[FindWith],
        values: &[LookupValue],
    ) -> Result<Vec<Product>, ServiceError> {
        validate_rows(self.products.search(keys, values).await)
    }

    pub async fn product_list(&self) -> Result<Vec<Product>, ServiceError> {
        validate_rows(self.products.all().await)
    }

    /// A product with its variants.
    pub async fn product_detail(&self, id: i64) -> Result<Product, ServiceError> {
        find_by_id(self.products.as_ref(), id).await
    }

    /// Creates a product, then each of its variants under the new id.
    ///
    /// A variant that fails to insert is logged and left out of the
    /// returned product; the product itself stays.
    pub async fn add_product(&self, product: Product) -> Result<Product, ServiceError> {
        validate_product(&product)?;
        for variant in &product.variants {
            validate_variant_fields(variant)?;
        }

        let mut created = validate_row(self.products.create(&product).await)?;

        for variant in product.variants {
            let variant = ProductVariant {
                product_id: created.id,
                ..variant
            };
            match self.variants.create(&variant).await {
                Ok(stored) => created.variants.push(stored),
                Err(e) => warn!(
                    product_id = created.id,
                    variant = %variant.name,
                    error = %e,
                    "Failed to create product variant"
                ),
            }
        }

        Ok(created)
    }

    /// Updates the product row; variants are edited separately.
    pub async fn edit_product(&self, product: Product) -> Result<Product, ServiceError> {
        validate_product(&product)?;
        validate_row(self.products.update(&product).await)
    }

    /// Deletes a product and, by cascade, its variants.
    pub async fn delete_product(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.products.as_ref(), id).await
    }

    // =========================================================================
    // Variants
    // =========================================================================

    pub async fn variant_list(&self, product_id: i64) -> Result<Vec<ProductVariant>, ServiceError> {
        validate_rows(
            self.variants
                .all_where(FindWith::ByRelationId, product_id.into())
                .await,
        )
    }

    pub async fn add_product_variant(
        &self,
        variant: ProductVariant,
    ) -> Result<ProductVariant, ServiceError> {
        validate_variant(&variant)?;
        validate_row(self.variants.create(&variant).await)
    }

    pub async fn edit_product_variant(
        &self,
        variant: ProductVariant,
    ) -> Result<ProductVariant, ServiceError> {
        validate_variant(&variant)?;
        validate_row(self.variants.update(&variant).await)
    }

    pub async fn delete_product_variant(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.variants.as_ref(), id).await
    }
}

fn validate_product(product: &Product) -> Result<(), ServiceError> {
    validate_name(&product.name)?;
    validate_sku(&product.sku)?;
    validate_price("price", product.price)?;
    validate_reference("category_id", product.category_id)?;
    validate_reference("subcategory_id", product.subcategory_id)?;
    Ok(())
}

/// Everything but the parent id, which `add_product` fills in.
fn validate_variant_fields(variant: &ProductVariant) -> Result<(), ServiceError> {
    validate_name(&variant.name)?;
    validate_price("price", variant.price)?;
    validate_reference("unit_id", variant.unit_id)?;
    Ok(())
}

fn validate_variant(variant: &ProductVariant) -> Result<(), ServiceError> {
    validate_reference("product_id", variant.product_id)?;
    validate_variant_fields(variant)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use posbe_core::{Category, ErrorCode, Subcategory, Unit};
    use posbe_db::DbConfig;

    struct Fixture {
        service: CatalogProductService,
        category_id: i64,
        subcategory_id: i64,
        unit_id: i64,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = db
            .categories()
            .create(&Category {
                name: "Coffee".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let subcategory = db
            .subcategories()
            .create(&Subcategory {
                category_id: category.id,
                name: "Hot".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let unit = db
            .units()
            .create(&Unit {
                magnitude: "volume".into(),
                name: "millilitre".into(),
                symbol: "ml".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        Fixture {
            service: CatalogProductService::new(&db),
            category_id: category.id,
            subcategory_id: subcategory.id,
            unit_id: unit.id,
        }
    }

    impl Fixture {
        fn product(&self, sku: &str, price: f64) -> Product {
            Product {
                category_id: self.category_id,
                subcategory_id: self.subcategory_id,
                sku: sku.into(),
                name: format!("{sku} name"),
                price,
                ..Default::default()
            }
        }

        fn variant(&self, name: &str, price: f64) -> ProductVariant {
            ProductVariant {
                unit_id: self.unit_id,
                unit_size: 250.0,
                kind: "size".into(),
                name: name.into(),
                price,
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn test_add_product_creates_variants() {
        let fx = setup().await;
        let mut latte = fx.product("LATTE", 4.0);
        latte.variants = vec![fx.variant("Regular", 4.0), fx.variant("Large", 5.0)];

        let created = fx.service.add_product(latte).await.unwrap();
        assert_eq!(created.variants.len(), 2);
        assert!(created.variants.iter().all(|v| v.product_id == created.id));

        let detail = fx.service.product_detail(created.id).await.unwrap();
        assert_eq!(detail.variants, created.variants);
        assert_eq!(fx.service.variant_list(created.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_product_search_and_list() {
        let fx = setup().await;
        for (sku, price) in [("ESP", 2.5), ("LATTE", 4.0), ("MOCHA", 4.5)] {
            fx.service.add_product(fx.product(sku, price)).await.unwrap();
        }

        assert_eq!(fx.service.product_list().await.unwrap().len(), 3);

        let found = fx
            .service
            .product_search(
                &[FindWith::ByCategoryId, FindWith::ByPriceRange],
                &[fx.category_id.into(), [4.0, 5.0].into()],
            )
            .await
            .unwrap();
        let skus: Vec<_> = found.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["LATTE", "MOCHA"]);

        // inverted range is passed through and matches nothing
        let none = fx
            .service
            .product_search(&[FindWith::ByPriceRange], &[[5.0, 4.0].into()])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_search_arity_mismatch_is_internal() {
        let fx = setup().await;
        let err = fx
            .service
            .product_search(&[FindWith::ByCategoryId], &[])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[tokio::test]
    async fn test_variant_lifecycle() {
        let fx = setup().await;
        let latte = fx.service.add_product(fx.product("LATTE", 4.0)).await.unwrap();

        let large = fx
            .service
            .add_product_variant(ProductVariant {
                product_id: latte.id,
                ..fx.variant("Large", 5.0)
            })
            .await
            .unwrap();

        let large = fx
            .service
            .edit_product_variant(ProductVariant { price: 5.5, ..large })
            .await
            .unwrap();
        assert_eq!(large.price, 5.5);

        fx.service.delete_product_variant(large.id).await.unwrap();
        let err = fx.service.delete_product_variant(large.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_product_then_detail_is_not_found() {
        let fx = setup().await;
        let mut esp = fx.product("ESP", 2.5);
        esp.variants = vec![fx.variant("Single", 2.5)];
        let esp = fx.service.add_product(esp).await.unwrap();

        fx.service.delete_product(esp.id).await.unwrap();

        let err = fx.service.product_detail(esp.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(fx.service.variant_list(esp.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_sku_is_unprocessable() {
        let fx = setup().await;
        let err = fx
            .service
            .add_product(fx.product("flat white", 4.0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unprocessable);
    }
}
