//! # Connection Pool
//!
//! Opens the SQLite pool, applies the schema and hands out repositories.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Database::new(config)                           │
//! │                                                                         │
//! │  DbConfig { path, max/min connections, acquire/idle timeouts }          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  connect options: WAL, synchronous = NORMAL, foreign_keys = ON          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool  ─── one connection per concurrent repository call ───┐     │
//! │       │                                                           │     │
//! │       ▼                                                           ▼     │
//! │  embedded migrations (001, 002, ...)        db.roles(), db.products()   │
//! │                                             db.floors(), ...            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories are cheap handles over a clone of the pool; build them per
//! call or keep them, either works.
//!
//! `:memory:` is special: every SQLite connection to it opens a separate,
//! empty database, so the in-memory configuration pins the pool to one
//! connection that never idles out.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    AddonRepository, CategoryRepository, FloorRepository, ProductRepository,
    ProductVariantRepository, RoleRepository, RoomRepository, StorePrefSqlRepository,
    SubcategoryRepository, TableRepository, UnitRepository, UserRepository,
};

const MEMORY_PATH: &str = ":memory:";

/// Upper bound on a file-backed connection's age.
const MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/posbe/posbe.db")
///     .max_connections(8)
///     .acquire_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for a private
    /// throwaway database.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// How long a repository call waits for a free connection before
    /// failing with `DbError::PoolExhausted`. The only timeout in the layer.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Default: 10 minutes. Ignored for `:memory:`.
    pub idle_timeout: Duration,

    /// Apply pending migrations in [`Database::new`]. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// A private in-memory database with the schema applied. Two pools
    /// built from this never see each other's rows.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_url(&self) -> String {
        if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.connect_url())
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite; cascades and FK checks depend on it
            .foreign_keys(true)
            .create_if_missing(true);

        Ok(options)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            // the database dies with its connection
            options.max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            options
                .idle_timeout(Some(self.idle_timeout))
                .max_lifetime(Some(MAX_LIFETIME))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle and repository factory.
///
/// Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, migrates.
    ///
    /// ## Errors
    /// - `ConnectionFailed` - bad path, unwritable directory
    /// - `MigrationFailed` - a migration did not apply
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening database"
        );

        let connect_options = config.connect_options()?;
        debug!(url = %config.connect_url(), "Connect options ready");

        let pool = config
            .pool_options()
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            in_memory = config.is_in_memory(),
            "Database pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    pub fn roles(&self) -> RoleRepository {
        RoleRepository::new(self.pool.clone())
    }

    /// Users, always joined with their role.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn units(&self) -> UnitRepository {
        UnitRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn subcategories(&self) -> SubcategoryRepository {
        SubcategoryRepository::new(self.pool.clone())
    }

    pub fn addons(&self) -> AddonRepository {
        AddonRepository::new(self.pool.clone())
    }

    /// Products; the only searchable repository.
    ///
    /// ```rust,ignore
    /// let coffee = db.products()
    ///     .search(&[FindWith::ByCategoryId], &[3.into()])
    ///     .await?;
    /// ```
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn product_variants(&self) -> ProductVariantRepository {
        ProductVariantRepository::new(self.pool.clone())
    }

    pub fn floors(&self) -> FloorRepository {
        FloorRepository::new(self.pool.clone())
    }

    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.pool.clone())
    }

    pub fn rooms(&self) -> RoomRepository {
        RoomRepository::new(self.pool.clone())
    }

    pub fn store_prefs(&self) -> StorePrefSqlRepository {
        StorePrefSqlRepository::new(self.pool.clone())
    }

    /// Closes every connection. Repository calls made afterwards fail
    /// (they never report absence).
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
