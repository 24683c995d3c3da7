//! # Account Service
//!
//! Roles, back-office users and the credential check used at login.
//!
//! ## Caching
//! The role list is cached under [`ROLES_CACHE_KEY`]. Each role carries its
//! `usage` count, so user writes invalidate the key as well as role writes.
//!
//! ## Passwords
//! Non-empty passwords are argon2-hashed before they reach the repository.
//! Hashes never leave this service: every returned `User` has its password
//! stripped.

use std::sync::Arc;

use posbe_cache::ReadThroughCache;
use posbe_core::validation::{validate_email, validate_name, validate_reference, validate_username};
use posbe_core::{validate_row, validate_rows, FindWith, Role, ServiceError, User};
use posbe_db::{CrudRepository, Database};
use tracing::{debug, info};

use crate::password::{hash_password, verify_password};
use crate::{cached_list, find_by_id, UNABLE_TO_DELETE};

/// Cache key of the role list.
pub const ROLES_CACHE_KEY: &str = "roles";

/// Message returned when a supplied password does not match.
pub const PASSWORD_NOT_MATCH: &str = "Password Not Match";

#[derive(Clone)]
pub struct AccountService {
    roles: Arc<dyn CrudRepository<Role>>,
    users: Arc<dyn CrudRepository<User>>,
    cache: ReadThroughCache,
}

impl AccountService {
    pub fn new(db: &Database, cache: ReadThroughCache) -> Self {
        Self::with_repositories(Arc::new(db.roles()), Arc::new(db.users()), cache)
    }

    pub fn with_repositories(
        roles: Arc<dyn CrudRepository<Role>>,
        users: Arc<dyn CrudRepository<User>>,
        cache: ReadThroughCache,
    ) -> Self {
        AccountService { roles, users, cache }
    }

    // =========================================================================
    // Roles
    // =========================================================================

    pub async fn role_list(&self) -> Result<Vec<Role>, ServiceError> {
        cached_list(&self.cache, ROLES_CACHE_KEY, self.roles.as_ref()).await
    }

    pub async fn add_role(&self, role: Role) -> Result<Role, ServiceError> {
        validate_name(&role.name)?;

        let result = validate_row(self.roles.create(&role).await);
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        result
    }

    pub async fn edit_role(&self, role: Role) -> Result<Role, ServiceError> {
        validate_name(&role.name)?;

        let result = validate_row(self.roles.update(&role).await);
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        result
    }

    /// Deletes a role nobody holds.
    ///
    /// ## Errors
    /// - `NotFound` - no role with `id`
    /// - `Forbidden` - at least one user still has the role
    pub async fn delete_role(&self, id: i64) -> Result<(), ServiceError> {
        let role: Role = find_by_id(self.roles.as_ref(), id).await?;

        if role.in_use() {
            debug!(id, usage = role.usage, "Refusing to delete role in use");
            return Err(ServiceError::forbidden(UNABLE_TO_DELETE));
        }

        validate_row(self.roles.delete(&role).await)?;
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn user_list(&self) -> Result<Vec<User>, ServiceError> {
        let users = validate_rows(self.users.all().await)?;
        Ok(users.into_iter().map(User::without_password).collect())
    }

    pub async fn show_user(&self, id: i64) -> Result<User, ServiceError> {
        find_by_id(self.users.as_ref(), id)
            .await
            .map(User::without_password)
    }

    pub async fn add_user(&self, mut user: User) -> Result<User, ServiceError> {
        validate_user(&user)?;

        if !user.password.is_empty() {
            user.password = hash_password(&user.password)?;
        }

        let result = validate_row(self.users.create(&user).await);
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        result.map(User::without_password)
    }

    /// Updates a user. An empty password keeps the stored hash.
    pub async fn edit_user(&self, mut user: User) -> Result<User, ServiceError> {
        validate_user(&user)?;

        if user.password.is_empty() {
            let stored: User = find_by_id(self.users.as_ref(), user.id).await?;
            user.password = stored.password;
        } else {
            user.password = hash_password(&user.password)?;
        }

        let result = validate_row(self.users.update(&user).await);
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        result.map(User::without_password)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        let user: User = find_by_id(self.users.as_ref(), id).await?;
        validate_row(self.users.delete(&user).await)?;
        self.cache.invalidate(ROLES_CACHE_KEY).await;
        Ok(())
    }

    /// Looks up `username` and checks `password` against its stored hash.
    ///
    /// ## Errors
    /// - `NotFound` - unknown username
    /// - `Unprocessable` - wrong password
    /// - `Internal` - backend failure or a stored value that is not a hash
    pub async fn verify_user_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let user = validate_row(self.users.find(FindWith::ByUsername, username.into()).await)?;

        if !verify_password(&user.password, password)? {
            info!(username, "Rejected login: password mismatch");
            return Err(ServiceError::unprocessable(PASSWORD_NOT_MATCH));
        }

        Ok(user.without_password())
    }
}

fn validate_user(user: &User) -> Result<(), ServiceError> {
    validate_name(&user.name)?;
    validate_username(&user.username)?;
    validate_email(user.email.as_deref())?;
    validate_reference("role_id", user.role_id)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
