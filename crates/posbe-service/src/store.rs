//! # Store Service
//!
//! Floor plan management: floors and the tables and rooms placed on them.
//!
//! ## Floor Plan Read
//! ```text
//! floors_with(FloorLayout::Tables)
//!   │
//!   ├── floors.all()                      (totals computed per floor)
//!   ├── keep floors with total_tables >= 1
//!   └── per kept floor: tables.all_where(ByRelationId, floor.id)
//! ```
//! A failure loading one floor's children leaves that floor's list empty
//! instead of failing the whole plan.

use std::sync::Arc;

use posbe_core::validation::{validate_name, validate_price, validate_reference};
use posbe_core::{validate_row, validate_rows, FindWith, Floor, FloorLayout, Room, ServiceError, Table};
use posbe_db::{CrudRepository, CrudWhereRepository, Database};
use tracing::{debug, warn};

use crate::{find_by_id, find_then_delete, UNABLE_TO_DELETE};

#[derive(Clone)]
pub struct StoreService {
    floors: Arc<dyn CrudRepository<Floor>>,
    tables: Arc<dyn CrudWhereRepository<Table>>,
    rooms: Arc<dyn CrudWhereRepository<Room>>,
}

impl StoreService {
    pub fn new(db: &Database) -> Self {
        StoreService {
            floors: Arc::new(db.floors()),
            tables: Arc::new(db.tables()),
            rooms: Arc::new(db.rooms()),
        }
    }

    // =========================================================================
    // Floors
    // =========================================================================

    pub async fn floor_list(&self) -> Result<Vec<Floor>, ServiceError> {
        validate_rows(self.floors.all().await)
    }

    pub async fn add_floor(&self, floor: Floor) -> Result<Floor, ServiceError> {
        validate_name(&floor.name)?;
        validate_row(self.floors.create(&floor).await)
    }

    pub async fn edit_floor(&self, floor: Floor) -> Result<Floor, ServiceError> {
        validate_name(&floor.name)?;
        validate_row(self.floors.update(&floor).await)
    }

    /// Deletes an empty floor.
    ///
    /// ## Errors
    /// - `NotFound` - no floor with `id`
    /// - `Forbidden` - the floor still holds tables or rooms
    pub async fn delete_floor(&self, id: i64) -> Result<(), ServiceError> {
        let floor: Floor = find_by_id(self.floors.as_ref(), id).await?;

        if floor.total_tables >= 1 || floor.total_rooms >= 1 {
            debug!(
                id,
                tables = floor.total_tables,
                rooms = floor.total_rooms,
                "Refusing to delete floor in use"
            );
            return Err(ServiceError::forbidden(UNABLE_TO_DELETE));
        }

        validate_row(self.floors.delete(&floor).await)
    }

    /// Floors holding at least one table (or room), with those attached.
    pub async fn floors_with(&self, layout: FloorLayout) -> Result<Vec<Floor>, ServiceError> {
        let floors = validate_rows(self.floors.all().await)?;
        let mut plan = Vec::new();

        for mut floor in floors {
            match layout {
                FloorLayout::Tables if floor.total_tables >= 1 => {
                    floor.tables = self
                        .tables
                        .all_where(FindWith::ByRelationId, floor.id.into())
                        .await
                        .unwrap_or_else(|e| {
                            warn!(floor_id = floor.id, error = %e, "Failed to load floor tables");
                            Vec::new()
                        });
                    plan.push(floor);
                }
                FloorLayout::Rooms if floor.total_rooms >= 1 => {
                    floor.rooms = self
                        .rooms
                        .all_where(FindWith::ByRelationId, floor.id.into())
                        .await
                        .unwrap_or_else(|e| {
                            warn!(floor_id = floor.id, error = %e, "Failed to load floor rooms");
                            Vec::new()
                        });
                    plan.push(floor);
                }
                FloorLayout::Tables | FloorLayout::Rooms => {}
            }
        }

        Ok(plan)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub async fn table_list(&self) -> Result<Vec<Table>, ServiceError> {
        validate_rows(self.tables.all().await)
    }

    pub async fn add_table(&self, table: Table) -> Result<Table, ServiceError> {
        validate_table(&table)?;
        validate_row(self.tables.create(&table).await)
    }

    pub async fn edit_table(&self, table: Table) -> Result<Table, ServiceError> {
        validate_table(&table)?;
        validate_row(self.tables.update(&table).await)
    }

    pub async fn delete_table(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.tables.as_ref(), id).await
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    pub async fn room_list(&self) -> Result<Vec<Room>, ServiceError> {
        validate_rows(self.rooms.all().await)
    }

    pub async fn add_room(&self, room: Room) -> Result<Room, ServiceError> {
        validate_room(&room)?;
        validate_row(self.rooms.create(&room).await)
    }

    pub async fn edit_room(&self, room: Room) -> Result<Room, ServiceError> {
        validate_room(&room)?;
        validate_row(self.rooms.update(&room).await)
    }

    pub async fn delete_room(&self, id: i64) -> Result<(), ServiceError> {
        find_then_delete(self.rooms.as_ref(), id).await
    }
}

fn validate_table(table: &Table) -> Result<(), ServiceError> {
    validate_name(&table.name)?;
    validate_reference("floor_id", table.floor_id)?;
    Ok(())
}

fn validate_room(room: &Room) -> Result<(), ServiceError> {
    validate_name(&room.name)?;
    validate_reference("floor_id", room.floor_id)?;
    validate_price("price", room.price)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
