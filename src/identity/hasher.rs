//! One-way password hashing.
//!
//! bcrypt is CPU bound, so the async helpers push every call onto tokio's
//! blocking pool.

use super::error::HashError;
use std::sync::Arc;

pub const DEFAULT_BCRYPT_COST: u32 = 10;

const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];

pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh salt.
    ///
    /// # Errors
    /// Returns an error if the hashing primitive fails.
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Compare `plaintext` against a stored hash.
    ///
    /// # Errors
    /// Returns an error when `stored` is not a well-formed hash.
    fn verify(&self, plaintext: &str, stored: &str) -> Result<bool, HashError>;

    /// Whether `value` already carries this hasher's prefix.
    fn is_hashed(&self, value: &str) -> bool;
}

#[derive(Clone, Copy, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    fn verify(&self, plaintext: &str, stored: &str) -> Result<bool, HashError> {
        Ok(bcrypt::verify(plaintext, stored)?)
    }

    fn is_hashed(&self, value: &str) -> bool {
        BCRYPT_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
    }
}

pub(crate) async fn hash_blocking(
    hasher: &Arc<dyn PasswordHasher>,
    plaintext: &str,
) -> Result<String, HashError> {
    let hasher = Arc::clone(hasher);
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(|_| HashError::Aborted)?
}

pub(crate) async fn verify_blocking(
    hasher: &Arc<dyn PasswordHasher>,
    plaintext: &str,
    stored: &str,
) -> Result<bool, HashError> {
    let hasher = Arc::clone(hasher);
    let plaintext = plaintext.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored))
        .await
        .map_err(|_| HashError::Aborted)?
}
