//! Profile writes and the admin-facing record operations.

use super::error::RegistryError;
use super::hasher::hash_blocking;
use super::identifier::normalize;
use super::record::{StudentPatch, StudentRecord};
use super::Registrar;
use tracing::{debug, instrument};

impl Registrar {
    /// Create-or-merge the record for `identifier` in a single store write.
    ///
    /// Fields absent from `patch` are left untouched. A supplied credential that
    /// is not already hashed is hashed before the write.
    ///
    /// # Errors
    /// [`RegistryError::MissingIdentifier`] on an empty identifier, otherwise
    /// collaborator failures.
    #[instrument(skip(self, patch))]
    pub async fn upsert(
        &self,
        identifier: &str,
        patch: StudentPatch,
    ) -> Result<StudentRecord, RegistryError> {
        let identifier = required(identifier)?;
        let patch = self.seal_credential(patch).await?;

        let record = self.store.upsert(&identifier, &patch).await?;
        debug!(revision = record.revision, "student profile saved");

        Ok(record)
    }

    /// Merge into an existing record only. Returns `None` when absent.
    ///
    /// # Errors
    /// [`RegistryError::MissingIdentifier`] on an empty identifier, otherwise
    /// collaborator failures.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        identifier: &str,
        patch: StudentPatch,
    ) -> Result<Option<StudentRecord>, RegistryError> {
        let identifier = required(identifier)?;
        let patch = self.seal_credential(patch).await?;

        Ok(self.store.update_by_identifier(&identifier, &patch).await?)
    }

    /// # Errors
    /// [`RegistryError::MissingIdentifier`] on an empty identifier, otherwise
    /// collaborator failures.
    #[instrument(skip(self))]
    pub async fn lookup(&self, identifier: &str) -> Result<Option<StudentRecord>, RegistryError> {
        let identifier = required(identifier)?;
        Ok(self.store.find_by_identifier(&identifier).await?)
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn list(&self) -> Result<Vec<StudentRecord>, RegistryError> {
        Ok(self.store.list().await?)
    }

    /// # Errors
    /// [`RegistryError::MissingIdentifier`] on an empty identifier, otherwise
    /// collaborator failures.
    #[instrument(skip(self))]
    pub async fn delete(&self, identifier: &str) -> Result<bool, RegistryError> {
        let identifier = required(identifier)?;
        Ok(self.store.delete_by_identifier(&identifier).await?)
    }

    async fn seal_credential(&self, mut patch: StudentPatch) -> Result<StudentPatch, RegistryError> {
        if let Some(credential) = patch.credential.take() {
            if credential.is_empty() {
                // Set-if-present: a blank password is treated as not supplied.
                return Ok(patch);
            }

            patch.credential = Some(if self.hasher.is_hashed(&credential) {
                credential
            } else {
                hash_blocking(&self.hasher, &credential).await?
            });
        }

        Ok(patch)
    }
}

fn required(identifier: &str) -> Result<String, RegistryError> {
    let identifier = normalize(identifier);
    if identifier.is_empty() {
        return Err(RegistryError::MissingIdentifier);
    }
    Ok(identifier)
}
