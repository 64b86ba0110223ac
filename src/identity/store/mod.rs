//! Keyed record storage.
//!
//! The store is the only concurrency safety net: it must reject a second
//! insert for the same identifier and apply each write atomically.

use super::error::StoreError;
use super::record::{NewStudent, StudentPatch, StudentRecord};
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str)
        -> Result<Option<StudentRecord>, StoreError>;

    /// Create a record. Fails with [`StoreError::Duplicate`] when the
    /// identifier is taken.
    async fn insert(&self, record: NewStudent) -> Result<StudentRecord, StoreError>;

    /// Merge `patch` into an existing record. Returns `None` if absent.
    async fn update_by_identifier(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<Option<StudentRecord>, StoreError>;

    /// Replace the credential only while it still equals `expected`
    /// (`None` matches a record that has no credential yet). Returns `None`
    /// when the record is absent or its credential changed meanwhile.
    async fn swap_credential(
        &self,
        identifier: &str,
        expected: Option<&str>,
        credential: &str,
    ) -> Result<Option<StudentRecord>, StoreError>;

    /// Create-or-merge in a single atomic write.
    async fn upsert(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<StudentRecord, StoreError>;

    /// All records ordered by identifier.
    async fn list(&self) -> Result<Vec<StudentRecord>, StoreError>;

    async fn delete_by_identifier(&self, identifier: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn kind(&self) -> &'static str;
}
