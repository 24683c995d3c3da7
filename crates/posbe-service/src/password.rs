//! Argon2 password hashing for back-office users.
//!
//! Stored passwords are PHC strings (`$argon2id$v=19$...`), so the salt and
//! parameters travel with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use posbe_core::ServiceError;

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::internal(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Checks `supplied` against a stored PHC hash.
///
/// ## Outcomes
/// - `Ok(true)` / `Ok(false)` - match / mismatch
/// - `Err(Internal)` - the stored value is not a valid hash
pub fn verify_password(stored: &str, supplied: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|_| ServiceError::internal("did not provide a valid hash"))?;

    Ok(Argon2::default()
        .verify_password(supplied.as_bytes(), &parsed)
        .is_ok())
}
