//! # Catalog Reference Repositories
//!
//! Units, categories, subcategories and addons: small reference tables the
//! services cache as whole lists.
//!
//! Categories are returned with their subcategories attached; the
//! subcategories are loaded with one extra query per call, not per row.

use std::collections::HashMap;

use async_trait::async_trait;
use posbe_core::{Addon, Category, Entity, FindWith, LookupValue, Subcategory, Unit};
use sqlx::SqlitePool;
use tracing::debug;

use super::filter::{fetch_first, fetch_matching, Filter};
use super::{CrudRepository, CrudWhereRepository};
use crate::error::{DbError, DbResult};

// =============================================================================
// Unit
// =============================================================================

const SELECT_UNIT: &str = "SELECT id, magnitude, name, symbol FROM units";

/// SQLite adapter for [`Unit`].
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Unit::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Unit> for UnitRepository {
    async fn all(&self) -> DbResult<Vec<Unit>> {
        fetch_matching(&self.pool, Unit::KIND, SELECT_UNIT, &[], &[], "id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Unit> {
        fetch_first(&self.pool, Unit::KIND, SELECT_UNIT, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Unit) -> DbResult<Unit> {
        debug!(name = %data.name, "Inserting unit");

        let unit = sqlx::query_as::<_, Unit>(
            "INSERT INTO units (magnitude, name, symbol) VALUES (?1, ?2, ?3) \
             RETURNING id, magnitude, name, symbol",
        )
        .bind(&data.magnitude)
        .bind(&data.name)
        .bind(&data.symbol)
        .fetch_one(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn update(&self, data: &Unit) -> DbResult<Unit> {
        debug!(id = data.id, "Updating unit");

        sqlx::query_as::<_, Unit>(
            "UPDATE units SET magnitude = ?1, name = ?2, symbol = ?3 WHERE id = ?4 \
             RETURNING id, magnitude, name, symbol",
        )
        .bind(&data.magnitude)
        .bind(&data.name)
        .bind(&data.symbol)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Unit::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Unit) -> DbResult<()> {
        debug!(id = data.id, "Deleting unit");

        sqlx::query("DELETE FROM units WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Category
// =============================================================================

const SELECT_CATEGORY: &str = "SELECT id, name FROM categories";

/// SQLite adapter for [`Category`].
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Category::KIND, key)),
        }
    }

    /// Attaches subcategories to every category in `categories`.
    async fn attach_subcategories(&self, categories: &mut [Category]) -> DbResult<()> {
        if categories.is_empty() {
            return Ok(());
        }

        let subcategories = sqlx::query_as::<_, Subcategory>(
            "SELECT id, category_id, name FROM subcategories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_category: HashMap<i64, Vec<Subcategory>> = HashMap::new();
        for subcategory in subcategories {
            by_category
                .entry(subcategory.category_id)
                .or_default()
                .push(subcategory);
        }

        for category in categories.iter_mut() {
            category.subcategories = by_category.remove(&category.id).unwrap_or_default();
        }

        Ok(())
    }
}

#[async_trait]
impl CrudRepository<Category> for CategoryRepository {
    async fn all(&self) -> DbResult<Vec<Category>> {
        let mut categories: Vec<Category> = fetch_matching(
            &self.pool,
            Category::KIND,
            SELECT_CATEGORY,
            &[],
            &[],
            "id",
            Self::filter,
        )
        .await?;
        self.attach_subcategories(&mut categories).await?;
        Ok(categories)
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Category> {
        let category: Category =
            fetch_first(&self.pool, Category::KIND, SELECT_CATEGORY, key, &value, Self::filter)
                .await?;
        let mut found = [category];
        self.attach_subcategories(&mut found).await?;
        let [category] = found;
        Ok(category)
    }

    async fn create(&self, data: &Category) -> DbResult<Category> {
        debug!(name = %data.name, "Inserting category");

        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES (?1) RETURNING id, name",
        )
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn update(&self, data: &Category) -> DbResult<Category> {
        debug!(id = data.id, "Updating category");

        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?1 WHERE id = ?2 RETURNING id, name",
        )
        .bind(&data.name)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Category::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Category) -> DbResult<()> {
        debug!(id = data.id, "Deleting category");

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Subcategory
// =============================================================================

const SELECT_SUBCATEGORY: &str = "SELECT id, category_id, name FROM subcategories";

/// SQLite adapter for [`Subcategory`]. `ByRelationId` is the category id.
#[derive(Debug, Clone)]
pub struct SubcategoryRepository {
    pool: SqlitePool,
}

impl SubcategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SubcategoryRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByRelationId | FindWith::ByCategoryId => Ok(Filter::Int("category_id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Subcategory::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Subcategory> for SubcategoryRepository {
    async fn all(&self) -> DbResult<Vec<Subcategory>> {
        fetch_matching(
            &self.pool,
            Subcategory::KIND,
            SELECT_SUBCATEGORY,
            &[],
            &[],
            "id",
            Self::filter,
        )
        .await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Subcategory> {
        fetch_first(&self.pool, Subcategory::KIND, SELECT_SUBCATEGORY, key, &value, Self::filter)
            .await
    }

    async fn create(&self, data: &Subcategory) -> DbResult<Subcategory> {
        debug!(name = %data.name, category_id = data.category_id, "Inserting subcategory");

        let subcategory = sqlx::query_as::<_, Subcategory>(
            "INSERT INTO subcategories (category_id, name) VALUES (?1, ?2) \
             RETURNING id, category_id, name",
        )
        .bind(data.category_id)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(subcategory)
    }

    async fn update(&self, data: &Subcategory) -> DbResult<Subcategory> {
        debug!(id = data.id, "Updating subcategory");

        sqlx::query_as::<_, Subcategory>(
            "UPDATE subcategories SET category_id = ?1, name = ?2 WHERE id = ?3 \
             RETURNING id, category_id, name",
        )
        .bind(data.category_id)
        .bind(&data.name)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Subcategory::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Subcategory) -> DbResult<()> {
        debug!(id = data.id, "Deleting subcategory");

        sqlx::query("DELETE FROM subcategories WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CrudWhereRepository<Subcategory> for SubcategoryRepository {
    async fn all_where(&self, key: FindWith, value: LookupValue) -> DbResult<Vec<Subcategory>> {
        fetch_matching(
            &self.pool,
            Subcategory::KIND,
            SELECT_SUBCATEGORY,
            &[key],
            &[value],
            "id",
            Self::filter,
        )
        .await
    }
}

// =============================================================================
// Addon
// =============================================================================

const SELECT_ADDON: &str = "SELECT id, name, description, price FROM addons";

/// SQLite adapter for [`Addon`].
#[derive(Debug, Clone)]
pub struct AddonRepository {
    pool: SqlitePool,
}

impl AddonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddonRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByPriceRange => Ok(Filter::Between("price")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId => Err(DbError::unsupported(Addon::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Addon> for AddonRepository {
    async fn all(&self) -> DbResult<Vec<Addon>> {
        fetch_matching(&self.pool, Addon::KIND, SELECT_ADDON, &[], &[], "id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Addon> {
        fetch_first(&self.pool, Addon::KIND, SELECT_ADDON, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Addon) -> DbResult<Addon> {
        debug!(name = %data.name, "Inserting addon");

        let addon = sqlx::query_as::<_, Addon>(
            "INSERT INTO addons (name, description, price) VALUES (?1, ?2, ?3) \
             RETURNING id, name, description, price",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(addon)
    }

    async fn update(&self, data: &Addon) -> DbResult<Addon> {
        debug!(id = data.id, "Updating addon");

        sqlx::query_as::<_, Addon>(
            "UPDATE addons SET name = ?1, description = ?2, price = ?3 WHERE id = ?4 \
             RETURNING id, name, description, price",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Addon::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Addon) -> DbResult<()> {
        debug!(id = data.id, "Deleting addon");

        sqlx::query("DELETE FROM addons WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use posbe_core::{normalize, Absence, ErrorCode};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn category(name: &str) -> Category {
        Category {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let db = setup().await;
        let repo = db.categories();

        let created = repo.create(&category("Espresso")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.find(FindWith::ById, created.id.into()).await.unwrap();
        assert_eq!(found, created);

        repo.delete(&found).await.unwrap();

        let err = repo.find(FindWith::ById, created.id.into()).await.unwrap_err();
        assert!(err.is_absence());
        assert_eq!(normalize(Some(&err)).unwrap().code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_categories_carry_subcategories() {
        let db = setup().await;
        let coffee = db.categories().create(&category("Coffee")).await.unwrap();
        let tea = db.categories().create(&category("Tea")).await.unwrap();
        for (category_id, name) in [(coffee.id, "Hot"), (coffee.id, "Iced"), (tea.id, "Green")] {
            db.subcategories()
                .create(&Subcategory {
                    id: 0,
                    category_id,
                    name: name.into(),
                })
                .await
                .unwrap();
        }

        let all = db.categories().all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].subcategories.len(), 2);
        assert_eq!(all[1].subcategories[0].name, "Green");

        let coffee_subs = db
            .subcategories()
            .all_where(FindWith::ByRelationId, coffee.id.into())
            .await
            .unwrap();
        assert_eq!(coffee_subs.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_unit_is_absence() {
        let db = setup().await;
        let ghost = Unit {
            id: 99,
            magnitude: "mass".into(),
            name: "kilogram".into(),
            symbol: "kg".into(),
        };
        assert!(db.units().update(&ghost).await.unwrap_err().is_absence());
    }

    #[tokio::test]
    async fn test_addon_price_round_trip() {
        let db = setup().await;
        let addon = db
            .addons()
            .create(&Addon {
                id: 0,
                name: "Extra shot".into(),
                description: "double espresso".into(),
                price: 7.5,
            })
            .await
            .unwrap();

        let mut edited = addon.clone();
        edited.price = 8.0;
        let edited = db.addons().update(&edited).await.unwrap();
        assert_eq!(edited.price, 8.0);
        assert_eq!(db.addons().all().await.unwrap(), vec![edited]);
    }

    #[tokio::test]
    async fn test_subcategory_requires_existing_category() {
        let db = setup().await;
        let err = db
            .subcategories()
            .create(&Subcategory {
                id: 0,
                category_id: 42,
                name: "Orphan".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(!err.is_absence());
    }
}
