//! # Store Layout Repositories
//!
//! Floors, the tables and rooms placed on them, and the key/value store
//! preferences.
//!
//! ## Floor Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  floors                                                                │
//! │  ┌────┬───────────┬──────────────┬─────────────┐                       │
//! │  │ id │ name      │ total_tables │ total_rooms │  ← correlated COUNTs  │
//! │  ├────┼───────────┼──────────────┼─────────────┤                       │
//! │  │ 1  │ Ground    │ 4            │ 0           │                       │
//! │  │ 2  │ Rooftop   │ 0            │ 3           │                       │
//! │  └────┴───────────┴──────────────┴─────────────┘                       │
//! │                                                                         │
//! │  tables / rooms: CrudWhereRepository, ByRelationId = floor_id          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use posbe_core::{Entity, FindWith, Floor, LookupValue, Room, StorePref, StoreSetting, Table};
use sqlx::SqlitePool;
use tracing::debug;

use super::filter::{fetch_first, fetch_matching, Filter};
use super::{now, CrudRepository, CrudWhereRepository, StorePrefRepository};
use crate::error::{DbError, DbResult};

// =============================================================================
// Floor
// =============================================================================

const SELECT_FLOOR: &str = "SELECT f.id, f.name, \
     (SELECT COUNT(*) FROM tables t WHERE t.floor_id = f.id) AS total_tables, \
     (SELECT COUNT(*) FROM rooms r WHERE r.floor_id = f.id) AS total_rooms, \
     f.created_at, f.updated_at FROM floors f";

/// SQLite adapter for [`Floor`].
#[derive(Debug, Clone)]
pub struct FloorRepository {
    pool: SqlitePool,
}

impl FloorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FloorRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("f.id")),
            FindWith::ByName => Ok(Filter::Text("f.name")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Floor::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Floor> for FloorRepository {
    async fn all(&self) -> DbResult<Vec<Floor>> {
        fetch_matching(&self.pool, Floor::KIND, SELECT_FLOOR, &[], &[], "f.id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Floor> {
        fetch_first(&self.pool, Floor::KIND, SELECT_FLOOR, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Floor) -> DbResult<Floor> {
        debug!(name = %data.name, "Inserting floor");

        let floor = sqlx::query_as::<_, Floor>(
            "INSERT INTO floors (name, created_at) VALUES (?1, ?2) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(&data.name)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;

        Ok(floor)
    }

    async fn update(&self, data: &Floor) -> DbResult<Floor> {
        debug!(id = data.id, "Updating floor");

        let result = sqlx::query("UPDATE floors SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&data.name)
            .bind(now())
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Floor::KIND, FindWith::ById, data.id));
        }

        // re-read so totals are current
        self.find(FindWith::ById, data.id.into()).await
    }

    async fn delete(&self, data: &Floor) -> DbResult<()> {
        debug!(id = data.id, "Deleting floor");

        sqlx::query("DELETE FROM floors WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Table
// =============================================================================

const SELECT_TABLE: &str = "SELECT id, floor_id, name, x_pos, y_pos, w_size, h_size, \
     capacity, type, created_at, updated_at FROM tables";

const TABLE_COLUMNS: &str =
    "id, floor_id, name, x_pos, y_pos, w_size, h_size, capacity, type, created_at, updated_at";

/// SQLite adapter for [`Table`]. `ByRelationId` is the floor id.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByRelationId => Ok(Filter::Int("floor_id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Table::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Table> for TableRepository {
    async fn all(&self) -> DbResult<Vec<Table>> {
        fetch_matching(&self.pool, Table::KIND, SELECT_TABLE, &[], &[], "id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Table> {
        fetch_first(&self.pool, Table::KIND, SELECT_TABLE, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Table) -> DbResult<Table> {
        debug!(floor_id = data.floor_id, name = %data.name, "Inserting table");

        let table = sqlx::query_as::<_, Table>(&format!(
            "INSERT INTO tables (floor_id, name, x_pos, y_pos, w_size, h_size, capacity, \
             type, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             RETURNING {TABLE_COLUMNS}"
        ))
        .bind(data.floor_id)
        .bind(&data.name)
        .bind(data.x_pos)
        .bind(data.y_pos)
        .bind(data.w_size)
        .bind(data.h_size)
        .bind(data.capacity)
        .bind(&data.kind)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;

        Ok(table)
    }

    async fn update(&self, data: &Table) -> DbResult<Table> {
        debug!(id = data.id, "Updating table");

        sqlx::query_as::<_, Table>(&format!(
            "UPDATE tables SET floor_id = ?1, name = ?2, x_pos = ?3, y_pos = ?4, \
             w_size = ?5, h_size = ?6, capacity = ?7, type = ?8, updated_at = ?9 \
             WHERE id = ?10 RETURNING {TABLE_COLUMNS}"
        ))
        .bind(data.floor_id)
        .bind(&data.name)
        .bind(data.x_pos)
        .bind(data.y_pos)
        .bind(data.w_size)
        .bind(data.h_size)
        .bind(data.capacity)
        .bind(&data.kind)
        .bind(now())
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Table::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Table) -> DbResult<()> {
        debug!(id = data.id, "Deleting table");

        sqlx::query("DELETE FROM tables WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CrudWhereRepository<Table> for TableRepository {
    async fn all_where(&self, key: FindWith, value: LookupValue) -> DbResult<Vec<Table>> {
        fetch_matching(&self.pool, Table::KIND, SELECT_TABLE, &[key], &[value], "id", Self::filter)
            .await
    }
}

// =============================================================================
// Room
// =============================================================================

const SELECT_ROOM: &str = "SELECT id, floor_id, name, x_pos, y_pos, w_size, h_size, \
     capacity, price, created_at, updated_at FROM rooms";

const ROOM_COLUMNS: &str =
    "id, floor_id, name, x_pos, y_pos, w_size, h_size, capacity, price, created_at, updated_at";

/// SQLite adapter for [`Room`]. `ByRelationId` is the floor id.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("id")),
            FindWith::ByRelationId => Ok(Filter::Int("floor_id")),
            FindWith::ByName => Ok(Filter::Text("name")),
            FindWith::ByPriceRange => Ok(Filter::Between("price")),
            FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId => Err(DbError::unsupported(Room::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Room> for RoomRepository {
    async fn all(&self) -> DbResult<Vec<Room>> {
        fetch_matching(&self.pool, Room::KIND, SELECT_ROOM, &[], &[], "id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Room> {
        fetch_first(&self.pool, Room::KIND, SELECT_ROOM, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Room) -> DbResult<Room> {
        debug!(floor_id = data.floor_id, name = %data.name, "Inserting room");

        let room = sqlx::query_as::<_, Room>(&format!(
            "INSERT INTO rooms (floor_id, name, x_pos, y_pos, w_size, h_size, capacity, \
             price, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(data.floor_id)
        .bind(&data.name)
        .bind(data.x_pos)
        .bind(data.y_pos)
        .bind(data.w_size)
        .bind(data.h_size)
        .bind(data.capacity)
        .bind(data.price)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;

        Ok(room)
    }

    async fn update(&self, data: &Room) -> DbResult<Room> {
        debug!(id = data.id, "Updating room");

        sqlx::query_as::<_, Room>(&format!(
            "UPDATE rooms SET floor_id = ?1, name = ?2, x_pos = ?3, y_pos = ?4, \
             w_size = ?5, h_size = ?6, capacity = ?7, price = ?8, updated_at = ?9 \
             WHERE id = ?10 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(data.floor_id)
        .bind(&data.name)
        .bind(data.x_pos)
        .bind(data.y_pos)
        .bind(data.w_size)
        .bind(data.h_size)
        .bind(data.capacity)
        .bind(data.price)
        .bind(now())
        .bind(data.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Room::KIND, FindWith::ById, data.id))
    }

    async fn delete(&self, data: &Room) -> DbResult<()> {
        debug!(id = data.id, "Deleting room");

        sqlx::query("DELETE FROM rooms WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CrudWhereRepository<Room> for RoomRepository {
    async fn all_where(&self, key: FindWith, value: LookupValue) -> DbResult<Vec<Room>> {
        fetch_matching(&self.pool, Room::KIND, SELECT_ROOM, &[key], &[value], "id", Self::filter)
            .await
    }
}

// =============================================================================
// Store Preferences
// =============================================================================

const STORE_PREF: &str = "StorePref";

/// SQLite adapter for the `store_prefs` key/value table.
#[derive(Debug, Clone)]
pub struct StorePrefSqlRepository {
    pool: SqlitePool,
}

impl StorePrefSqlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StorePrefSqlRepository { pool }
    }
}

fn single(pref: StorePref) -> StoreSetting {
    StoreSetting::from([(pref.key, pref.value)])
}

#[async_trait]
impl StorePrefRepository for StorePrefSqlRepository {
    async fn find(&self, key: &str) -> DbResult<StoreSetting> {
        debug!(key, "Finding store preference");

        sqlx::query_as::<_, StorePref>(
            "SELECT key, value, created_at, updated_at FROM store_prefs WHERE key = ?1 LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .map(single)
        .ok_or_else(|| DbError::not_found(STORE_PREF, "key", key))
    }

    async fn all(&self) -> DbResult<StoreSetting> {
        let prefs = sqlx::query_as::<_, StorePref>(
            "SELECT key, value, created_at, updated_at FROM store_prefs ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = prefs.len(), "Fetched store preferences");
        Ok(prefs.into_iter().map(|p| (p.key, p.value)).collect())
    }

    async fn update(&self, key: &str, value: &str) -> DbResult<StoreSetting> {
        debug!(key, "Updating store preference");

        sqlx::query_as::<_, StorePref>(
            "UPDATE store_prefs SET value = ?1, updated_at = ?2 WHERE key = ?3 \
             RETURNING key, value, created_at, updated_at",
        )
        .bind(value)
        .bind(now())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .map(single)
        .ok_or_else(|| DbError::not_found(STORE_PREF, "key", key))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use posbe_core::Absence;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn floor(name: &str) -> Floor {
        Floor {
            name: name.into(),
            ..Default::default()
        }
    }

    fn table(floor_id: i64, name: &str) -> Table {
        Table {
            floor_id,
            name: name.into(),
            w_size: 2.0,
            h_size: 2.0,
            capacity: 4,
            kind: "square".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_floor_totals() {
        let db = setup().await;
        let ground = db.floors().create(&floor("Ground")).await.unwrap();
        assert!(ground.created_at.is_some());
        assert_eq!(ground.total_tables, 0);

        for name in ["T1", "T2", "T3"] {
            db.tables().create(&table(ground.id, name)).await.unwrap();
        }
        db.rooms()
            .create(&Room {
                floor_id: ground.id,
                name: "VIP".into(),
                capacity: 8,
                price: 150.0,
                ..Default::default()
            })
            .await
            .unwrap();

        let ground = db.floors().find(FindWith::ById, ground.id.into()).await.unwrap();
        assert_eq!(ground.total_tables, 3);
        assert_eq!(ground.total_rooms, 1);
    }

    #[tokio::test]
    async fn test_tables_where_floor() {
        let db = setup().await;
        let ground = db.floors().create(&floor("Ground")).await.unwrap();
        let rooftop = db.floors().create(&floor("Rooftop")).await.unwrap();
        db.tables().create(&table(ground.id, "T1")).await.unwrap();
        db.tables().create(&table(rooftop.id, "R1")).await.unwrap();
        db.tables().create(&table(rooftop.id, "R2")).await.unwrap();

        let on_rooftop = db
            .tables()
            .all_where(FindWith::ByRelationId, rooftop.id.into())
            .await
            .unwrap();
        let names: Vec<_> = on_rooftop.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["R1", "R2"]);

        // deleting the floor cascades
        db.floors().delete(&rooftop).await.unwrap();
        assert_eq!(db.tables().all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_table_update_sets_updated_at() {
        let db = setup().await;
        let ground = db.floors().create(&floor("Ground")).await.unwrap();
        let mut t1 = db.tables().create(&table(ground.id, "T1")).await.unwrap();
        assert!(t1.updated_at.is_none());

        t1.capacity = 6;
        let t1 = db.tables().update(&t1).await.unwrap();
        assert_eq!(t1.capacity, 6);
        assert!(t1.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_store_prefs() {
        let db = setup().await;
        let prefs = db.store_prefs();

        let all = prefs.all().await.unwrap();
        assert!(all.contains_key("store_name"));

        let updated = prefs.update("store_name", "Kopi Senja").await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated["store_name"], "Kopi Senja");

        let found = prefs.find("store_name").await.unwrap();
        assert_eq!(found["store_name"], "Kopi Senja");

        assert!(prefs.find("nope").await.unwrap_err().is_absence());
        assert!(prefs.update("nope", "x").await.unwrap_err().is_absence());
    }
}
