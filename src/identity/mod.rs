//! Identity resolution and profile persistence.
//!
//! [`Registrar`] owns the two collaborators every operation needs, a
//! [`CredentialStore`] and a [`PasswordHasher`], plus the identifier policy.
//! It keeps no state of its own; concurrent registrations for the same
//! identifier are settled by the store's uniqueness constraint.

pub mod error;
pub mod hasher;
pub mod identifier;
pub mod profile;
pub mod record;
pub mod resolver;
pub mod store;

pub use error::{HashError, RegistryError, StoreError};
pub use hasher::{BcryptHasher, PasswordHasher};
pub use identifier::IdentifierPolicy;
pub use record::{Profile, StudentPatch, StudentRecord};
pub use resolver::Outcome;
pub use store::{CredentialStore, MemoryStore, PostgresStore};

use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct RegistrarConfig {
    policy: IdentifierPolicy,
    legacy_plaintext: bool,
}

impl RegistrarConfig {
    #[must_use]
    pub fn new(policy: IdentifierPolicy) -> Self {
        Self {
            policy,
            legacy_plaintext: true,
        }
    }

    /// Allow plaintext credentials left by older deployments to authenticate
    /// (and be upgraded to a hash).
    #[must_use]
    pub fn with_legacy_plaintext(mut self, enabled: bool) -> Self {
        self.legacy_plaintext = enabled;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &IdentifierPolicy {
        &self.policy
    }

    #[must_use]
    pub fn legacy_plaintext(&self) -> bool {
        self.legacy_plaintext
    }
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self::new(IdentifierPolicy::default())
    }
}

#[derive(Clone)]
pub struct Registrar {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    config: RegistrarConfig,
}

impl Registrar {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: RegistrarConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("store", &self.store.kind())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
