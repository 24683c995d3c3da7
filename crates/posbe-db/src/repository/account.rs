//! # Account Repositories
//!
//! Roles and users.
//!
//! ## Computed Columns
//! ```text
//! roles.usage = SELECT COUNT(*) FROM users WHERE users.role_id = roles.id
//! ```
//! `usage` is read-only: create/update never write it, and every read
//! recomputes it.
//!
//! Users are always read joined with their role. The stored password is
//! returned as-is (a hash); stripping it is the service's job.

use async_trait::async_trait;
use posbe_core::{Entity, FindWith, LookupValue, Role, User};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::filter::{fetch_first, fetch_matching, Filter};
use super::CrudRepository;
use crate::error::{DbError, DbResult};

// =============================================================================
// Role
// =============================================================================

const SELECT_ROLE: &str = "SELECT r.id, r.name, r.description, \
     (SELECT COUNT(*) FROM users u WHERE u.role_id = r.id) AS usage \
     FROM roles r";

/// SQLite adapter for [`Role`].
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("r.id")),
            FindWith::ByName => Ok(Filter::Text("r.name")),
            FindWith::ByRelationId
            | FindWith::ByUsername
            | FindWith::ByEmail
            | FindWith::ByPhone
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(Role::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<Role> for RoleRepository {
    async fn all(&self) -> DbResult<Vec<Role>> {
        fetch_matching(&self.pool, Role::KIND, SELECT_ROLE, &[], &[], "r.id", Self::filter).await
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<Role> {
        fetch_first(&self.pool, Role::KIND, SELECT_ROLE, key, &value, Self::filter).await
    }

    async fn create(&self, data: &Role) -> DbResult<Role> {
        debug!(name = %data.name, "Inserting role");

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES (?1, ?2) \
             RETURNING id, name, description",
        )
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    async fn update(&self, data: &Role) -> DbResult<Role> {
        debug!(id = data.id, "Updating role");

        let result = sqlx::query("UPDATE roles SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Role::KIND, FindWith::ById, data.id));
        }

        // re-read so usage reflects current users
        self.find(FindWith::ById, data.id.into()).await
    }

    async fn delete(&self, data: &Role) -> DbResult<()> {
        debug!(id = data.id, "Deleting role");

        sqlx::query("DELETE FROM roles WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// User
// =============================================================================

const SELECT_USER: &str = "SELECT u.id, u.role_id, u.name, u.username, u.email, u.phone, \
     u.password, r.name AS role_name, r.description AS role_description, \
     (SELECT COUNT(*) FROM users x WHERE x.role_id = r.id) AS role_usage \
     FROM users u JOIN roles r ON r.id = u.role_id";

/// Flat join row, folded into `User { role: Role, .. }`.
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    role_id: i64,
    name: String,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    password: String,
    role_name: String,
    role_description: String,
    role_usage: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            role_id: row.role_id,
            name: row.name,
            username: row.username,
            email: row.email,
            phone: row.phone,
            password: row.password,
            role: Role {
                id: row.role_id,
                name: row.role_name,
                description: row.role_description,
                usage: row.role_usage,
            },
        }
    }
}

/// SQLite adapter for [`User`].
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    fn filter(key: FindWith) -> DbResult<Filter> {
        match key {
            FindWith::ById => Ok(Filter::Int("u.id")),
            FindWith::ByName => Ok(Filter::Contains("u.name")),
            FindWith::ByUsername => Ok(Filter::Text("u.username")),
            FindWith::ByEmail => Ok(Filter::Text("u.email")),
            FindWith::ByPhone => Ok(Filter::Text("u.phone")),
            FindWith::ByRelationId
            | FindWith::BySku
            | FindWith::ByCategoryId
            | FindWith::BySubcategoryId
            | FindWith::ByPriceRange => Err(DbError::unsupported(User::KIND, key)),
        }
    }
}

#[async_trait]
impl CrudRepository<User> for UserRepository {
    async fn all(&self) -> DbResult<Vec<User>> {
        let rows: Vec<UserRow> =
            fetch_matching(&self.pool, User::KIND, SELECT_USER, &[], &[], "u.id", Self::filter)
                .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find(&self, key: FindWith, value: LookupValue) -> DbResult<User> {
        let row: UserRow =
            fetch_first(&self.pool, User::KIND, SELECT_USER, key, &value, Self::filter).await?;
        Ok(row.into())
    }

    async fn create(&self, data: &User) -> DbResult<User> {
        debug!(username = %data.username, role_id = data.role_id, "Inserting user");

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (role_id, name, username, email, phone, password) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
        )
        .bind(data.role_id)
        .bind(&data.name)
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.password)
        .fetch_one(&self.pool)
        .await?;

        self.find(FindWith::ById, id.into()).await
    }

    async fn update(&self, data: &User) -> DbResult<User> {
        debug!(id = data.id, "Updating user");

        let result = sqlx::query(
            "UPDATE users SET role_id = ?1, name = ?2, username = ?3, email = ?4, \
             phone = ?5, password = ?6 WHERE id = ?7",
        )
        .bind(data.role_id)
        .bind(&data.name)
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.password)
        .bind(data.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(User::KIND, FindWith::ById, data.id));
        }

        self.find(FindWith::ById, data.id.into()).await
    }

    async fn delete(&self, data: &User) -> DbResult<()> {
        debug!(id = data.id, "Deleting user");

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(data.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
