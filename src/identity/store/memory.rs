//! In-process store used when no database is configured.

use super::CredentialStore;
use crate::identity::error::StoreError;
use crate::identity::record::{NewStudent, StudentPatch, StudentRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, StudentRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record verbatim, bypassing every policy. Seeds legacy data.
    pub async fn seed(&self, record: StudentRecord) {
        self.records
            .lock()
            .await
            .insert(record.identifier.clone(), record);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        Ok(self.records.lock().await.get(identifier).cloned())
    }

    async fn insert(&self, record: NewStudent) -> Result<StudentRecord, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.identifier) {
            return Err(StoreError::Duplicate(record.identifier));
        }

        let stored = StudentRecord {
            id: Uuid::new_v4(),
            revision: 1,
            identifier: record.identifier,
            credential: record.credential,
            profile: record.profile,
        };
        records.insert(stored.identifier.clone(), stored.clone());

        Ok(stored)
    }

    async fn update_by_identifier(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let mut records = self.records.lock().await;
        Ok(records.get_mut(identifier).map(|record| {
            record.apply(patch);
            record.clone()
        }))
    }

    async fn swap_credential(
        &self,
        identifier: &str,
        expected: Option<&str>,
        credential: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let mut records = self.records.lock().await;
        Ok(records
            .get_mut(identifier)
            .filter(|record| record.credential.as_deref() == expected)
            .map(|record| {
                record.apply(&StudentPatch::credential(credential.to_string()));
                record.clone()
            }))
    }

    async fn upsert(
        &self,
        identifier: &str,
        patch: &StudentPatch,
    ) -> Result<StudentRecord, StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(identifier.to_string())
            .and_modify(|record| record.apply(patch))
            .or_insert_with(|| StudentRecord {
                id: Uuid::new_v4(),
                revision: 1,
                identifier: identifier.to_string(),
                credential: patch.credential.clone(),
                profile: patch.profile.clone(),
            });

        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<StudentRecord>, StoreError> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn delete_by_identifier(&self, identifier: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().await.remove(identifier).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
