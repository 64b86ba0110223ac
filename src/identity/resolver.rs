//! Login attempt resolution.
//!
//! Flow:
//! 1) Validate the identifier and password before touching the store.
//! 2) Unknown identifier: hash and insert, the store rejects a racing twin.
//! 3) Known identifier: verify against the stored hash; only when the stored
//!    value is not a hash at all, fall back to a plaintext comparison and
//!    upgrade the credential.
//! 4) Credential writes are conditional on the value read in step 3, so a
//!    concurrent claim or upgrade loses with `DuplicateIdentifier`.

use super::error::RegistryError;
use super::hasher::{hash_blocking, verify_blocking};
use super::identifier::normalize;
use super::record::{NewStudent, Profile, StudentRecord};
use super::Registrar;
use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    NewRegistration(StudentRecord),
    Authenticated(StudentRecord),
    Rejected,
}

impl Registrar {
    /// Decide whether `(identifier, password)` registers, authenticates or is
    /// rejected, writing at most one record change.
    ///
    /// # Errors
    /// - [`RegistryError::MissingCredentials`] / [`RegistryError::InvalidIdentifier`]
    ///   on bad input.
    /// - [`RegistryError::DuplicateIdentifier`] when a concurrent call created,
    ///   claimed or upgraded the same identifier first; the caller should
    ///   resolve again.
    /// - [`RegistryError::StoreUnavailable`] / [`RegistryError::Hashing`] when a
    ///   collaborator fails.
    #[instrument(skip(self, password))]
    pub async fn resolve(&self, identifier: &str, password: &str) -> Result<Outcome, RegistryError> {
        let identifier = normalize(identifier);
        if identifier.is_empty() || password.is_empty() {
            return Err(RegistryError::MissingCredentials);
        }

        if !self.config.policy().accepts(&identifier) {
            debug!(domain = self.config.policy().domain(), "identifier outside student domain");
            return Err(RegistryError::InvalidIdentifier);
        }

        let Some(record) = self.store.find_by_identifier(&identifier).await? else {
            return self.register(identifier, password).await;
        };

        let Some(stored) = record.credential.as_deref() else {
            // Created by a profile submit before any login: first password wins.
            info!("claiming credential for profile-only record");
            return self.settle_credential(&record.identifier, None, password).await;
        };

        match verify_blocking(&self.hasher, password, stored).await {
            Ok(true) => {
                debug!("password verified");
                return Ok(Outcome::Authenticated(record));
            }
            Ok(false) if self.hasher.is_hashed(stored) => {
                // A well-formed hash never falls back to plaintext comparison.
                debug!("password hash mismatch");
                return Ok(Outcome::Rejected);
            }
            Ok(false) => debug!("stored credential did not verify"),
            Err(err) => debug!("stored credential is not a valid hash: {err}"),
        }

        let matches_plaintext = bool::from(stored.as_bytes().ct_eq(password.as_bytes()));
        if self.config.legacy_plaintext() && matches_plaintext {
            info!("upgrading legacy plaintext credential");
            return self
                .settle_credential(&record.identifier, Some(stored), password)
                .await;
        }

        Ok(Outcome::Rejected)
    }

    async fn register(&self, identifier: String, password: &str) -> Result<Outcome, RegistryError> {
        let credential = hash_blocking(&self.hasher, password).await?;
        let record = self
            .store
            .insert(NewStudent {
                identifier,
                credential: Some(credential),
                profile: Profile::default(),
            })
            .await?;

        info!("new student registered");
        Ok(Outcome::NewRegistration(record))
    }

    /// Hash `password` and store it only while the credential is still
    /// `expected`. Losing that race surfaces as `DuplicateIdentifier` so the
    /// caller resolves again against the winner's credential.
    async fn settle_credential(
        &self,
        identifier: &str,
        expected: Option<&str>,
        password: &str,
    ) -> Result<Outcome, RegistryError> {
        let credential = hash_blocking(&self.hasher, password).await?;

        match self
            .store
            .swap_credential(identifier, expected, &credential)
            .await?
        {
            Some(updated) => Ok(Outcome::Authenticated(updated)),
            None => {
                warn!("credential changed or record removed during resolution");
                Err(RegistryError::DuplicateIdentifier)
            }
        }
    }
}
