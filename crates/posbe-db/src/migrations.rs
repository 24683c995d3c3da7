//! # Schema Migrations
//!
//! The schema ships inside the binary; there is no migrations directory to
//! deploy next to it.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql       roles, users, catalog, store layout
//! └── 002_default_store_prefs.sql  store_name, currency, feature_* keys
//!
//!   Database::new ──► MIGRATOR.run ──► _sqlx_migrations
//!                       │                 version | checksum | installed_on
//!                       └── skips every version already recorded
//! ```
//!
//! New files take the next number (`003_...sql`). Applied files are frozen:
//! sqlx compares checksums and refuses to start if one changed.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Embedded versus applied migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    /// True once every embedded migration has run.
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Applies whatever is pending, each migration in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");

    MIGRATOR.run(pool).await?;

    info!("Schema up to date");
    Ok(())
}

pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_is_current() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert_eq!(status.embedded, 2);
        assert!(status.is_current());

        // second run changes nothing
        db.run_migrations().await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), status);
    }

    #[tokio::test]
    async fn test_default_prefs_are_seeded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let currency: String =
            sqlx::query_scalar("SELECT value FROM store_prefs WHERE key = 'currency'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(currency, "IDR");
    }
}
