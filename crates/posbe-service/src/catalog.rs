//! # Catalog Common Service
//!
//! Units, categories, subcategories and addons: the small lists every
//! product form loads.
//!
//! ## Cache Keys
//! ```text
//! units          ◄── unit writes
//! categories     ◄── category writes, subcategory writes (embedded)
//! subcategories  ◄── subcategory writes, category deletes (cascade)
//! addons         ◄── addon writes
//! ```

use std::sync::Arc;

use posbe_cache::ReadThroughCache;
use posbe_core::validation::{validate_name, validate_price, validate_reference, validate_required};
use posbe_core::{validate_row, Addon, Category, ServiceError, Subcategory, Unit};
use posbe_db::{CrudRepository, Database};

use crate::{cached_list, find_then_delete};

pub const UNITS_CACHE_KEY: &str = "units";
pub const CATEGORIES_CACHE_KEY: &str = "categories";
pub const SUBCATEGORIES_CACHE_KEY: &str = "subcategories";
pub const ADDONS_CACHE_KEY: &str = "addons";

#[derive(Clone)]
pub struct CatalogCommonService {
    units: Arc<dyn CrudRepository<Unit>>,
    categories: Arc<dyn CrudRepository<Category>>,
    subcategories: Arc<dyn CrudRepository<Subcategory>>,
    addons: Arc<dyn CrudRepository<Addon>>,
    cache: ReadThroughCache,
}

impl CatalogCommonService {
    pub fn new(db: &Database, cache: ReadThroughCache) -> Self {
        CatalogCommonService {
            units: Arc::new(db.units()),
            categories: Arc::new(db.categories()),
            subcategories: Arc::new(db.subcategories()),
            addons: Arc::new(db.addons()),
            cache,
        }
    }

    async fn invalidate(&self, keys: &[&str]) {
        for key in keys {
            self.cache.invalidate(key).await;
        }
    }

    // =========================================================================
    // Units
    // =========================================================================

    pub async fn unit_list(&self) -> Result<Vec<Unit>, ServiceError> {
        cached_list(&self.cache, UNITS_CACHE_KEY, self.units.as_ref()).await
    }

    pub async fn add_unit(&self, unit: Unit) -> Result<Unit, ServiceError> {
        validate_unit(&unit)?;
        let result = validate_row(self.units.create(&unit).await);
        self.invalidate(&[UNITS_CACHE_KEY]).await;
        result
    }

    pub async fn edit_unit(&self, unit: Unit) -> Result<Unit, ServiceError> {
        validate_unit(&unit)?;
        let result = validate_row(self.units.update(&unit).await);
        self.invalidate(&[UNITS_CACHE_KEY]).await;
        result
    }

    pub async fn delete_unit(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.units.as_ref(), id).await?;
        self.invalidate(&[UNITS_CACHE_KEY]).await;
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Categories with their subcategories attached.
    pub async fn category_list(&self) -> Result<Vec<Category>, ServiceError> {
        cached_list(&self.cache, CATEGORIES_CACHE_KEY, self.categories.as_ref()).await
    }

    pub async fn add_category(&self, category: Category) -> Result<Category, ServiceError> {
        validate_name(&category.name)?;
        let result = validate_row(self.categories.create(&category).await);
        self.invalidate(&[CATEGORIES_CACHE_KEY]).await;
        result
    }

    pub async fn edit_category(&self, category: Category) -> Result<Category, ServiceError> {
        validate_name(&category.name)?;
        let result = validate_row(self.categories.update(&category).await);
        self.invalidate(&[CATEGORIES_CACHE_KEY]).await;
        result
    }

    /// Deletes a category and, by cascade, its subcategories.
    pub async fn delete_category(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.categories.as_ref(), id).await?;
        self.invalidate(&[CATEGORIES_CACHE_KEY, SUBCATEGORIES_CACHE_KEY])
            .await;
        Ok(())
    }

    // =========================================================================
    // Subcategories
    // =========================================================================

    pub async fn subcategory_list(&self) -> Result<Vec<Subcategory>, ServiceError> {
        cached_list(&self.cache, SUBCATEGORIES_CACHE_KEY, self.subcategories.as_ref()).await
    }

    pub async fn add_subcategory(&self, subcategory: Subcategory) -> Result<Subcategory, ServiceError> {
        validate_subcategory(&subcategory)?;
        let result = validate_row(self.subcategories.create(&subcategory).await);
        self.invalidate(&[SUBCATEGORIES_CACHE_KEY, CATEGORIES_CACHE_KEY])
            .await;
        result
    }

    pub async fn edit_subcategory(&self, subcategory: Subcategory) -> Result<Subcategory, ServiceError> {
        validate_subcategory(&subcategory)?;
        let result = validate_row(self.subcategories.update(&subcategory).await);
        self.invalidate(&[SUBCATEGORIES_CACHE_KEY, CATEGORIES_CACHE_KEY])
            .await;
        result
    }

    pub async fn delete_subcategory(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.subcategories.as_ref(), id).await?;
        self.invalidate(&[SUBCATEGORIES_CACHE_KEY, CATEGORIES_CACHE_KEY])
            .await;
        Ok(())
    }

    // =========================================================================
    // Addons
    // =========================================================================

    pub async fn addon_list(&self) -> Result<Vec<Addon>, ServiceError> {
        cached_list(&self.cache, ADDONS_CACHE_KEY, self.addons.as_ref()).await
    }

    pub async fn add_addon(&self, addon: Addon) -> Result<Addon, ServiceError> {
        validate_addon(&addon)?;
        let result = validate_row(self.addons.create(&addon).await);
        self.invalidate(&[ADDONS_CACHE_KEY]).await;
        result
    }

    pub async fn edit_addon(&self, addon: Addon) -> Result<Addon, ServiceError> {
        validate_addon(&addon)?;
        let result = validate_row(self.addons.update(&addon).await);
        self.invalidate(&[ADDONS_CACHE_KEY]).await;
        result
    }

    pub async fn delete_addon(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.addons.as_ref(), id).await?;
        self.invalidate(&[ADDONS_CACHE_KEY]).await;
        Ok(())
    }
}

fn validate_unit(unit: &Unit) -> Result<(), ServiceError> {
    validate_name(&unit.name)?;
    validate_required("symbol", &unit.symbol, 20)?;
    Ok(())
}

fn validate_subcategory(subcategory: &Subcategory) -> Result<(), ServiceError> {
    validate_name(&subcategory.name)?;
    validate_reference("category_id", subcategory.category_id)?;
    Ok(())
}

fn validate_addon(addon: &Addon) -> Result<(), ServiceError> {
    validate_name(&addon.name)?;
    validate_price("price", addon.price)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup;
    use posbe_cache::CacheStore;
    use posbe_core::ErrorCode;

    fn unit(name: &str, symbol: &str) -> Unit {
        Unit {
            magnitude: "mass".into(),
            name: name.into(),
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unit_crud_through_cache() {
        let (db, cache, store) = setup().await;
        let service = CatalogCommonService::new(&db, cache);

        let kg = service.add_unit(unit("kilogram", "kg")).await.unwrap();
        assert_eq!(service.unit_list().await.unwrap(), vec![kg.clone()]);
        assert!(store.get(UNITS_CACHE_KEY).await.unwrap().is_some());

        let kg = service
            .edit_unit(Unit {
                name: "Kilogram".into(),
                ..kg
            })
            .await
            .unwrap();
        assert_eq!(store.get(UNITS_CACHE_KEY).await.unwrap(), None);
        assert_eq!(service.unit_list().await.unwrap()[0].name, "Kilogram");

        service.delete_unit(kg.id).await.unwrap();
        assert!(service.unit_list().await.unwrap().is_empty());

        let err = service.delete_unit(kg.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_subcategory_write_refreshes_category_list() {
        let (db, cache, _store) = setup().await;
        let service = CatalogCommonService::new(&db, cache);

        let coffee = service
            .add_category(Category {
                name: "Coffee".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(service.category_list().await.unwrap()[0].subcategories.is_empty());

        service
            .add_subcategory(Subcategory {
                category_id: coffee.id,
                name: "Espresso based".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let categories = service.category_list().await.unwrap();
        assert_eq!(categories[0].subcategories.len(), 1);
        assert_eq!(service.subcategory_list().await.unwrap().len(), 1);

        // cascade removes the subcategory; both lists are refreshed
        service.delete_category(coffee.id).await.unwrap();
        assert!(service.category_list().await.unwrap().is_empty());
        assert!(service.subcategory_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addon_validation() {
        let (db, cache, _store) = setup().await;
        let service = CatalogCommonService::new(&db, cache);

        let err = service
            .add_addon(Addon {
                name: "Extra shot".into(),
                price: -1.0,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unprocessable);

        let shot = service
            .add_addon(Addon {
                name: "Extra shot".into(),
                description: "double it".into(),
                price: 0.5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(service.addon_list().await.unwrap(), vec![shot]);
    }

    #[tokio::test]
    async fn test_edit_missing_addon_is_not_found() {
        let (db, cache, _store) = setup().await;
        let service = CatalogCommonService::new(&db, cache);

        let err = service
            .edit_addon(Addon {
                id: 99,
                name: "Ghost".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
