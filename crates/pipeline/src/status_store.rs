//! In-memory import status store with per-entry expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use wayfarer_core::collaborators::ImportStatusStore;
use wayfarer_core::error::CoreError;
use wayfarer_core::import_status::ImportStatusRecord;
use wayfarer_core::types::ImportId;

struct Entry {
    record: ImportStatusRecord,
    expires_at: Instant,
}

/// Status records held in process memory.
///
/// Expired entries are invisible to `get` and are dropped on the next write.
#[derive(Default)]
pub struct InMemoryImportStatusStore {
    entries: RwLock<HashMap<ImportId, Entry>>,
}

impl InMemoryImportStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) records.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ImportStatusStore for InMemoryImportStatusStore {
    async fn put(&self, record: ImportStatusRecord, ttl: Duration) -> Result<(), CoreError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CoreError::Validation(format!("status TTL {ttl:?} is out of range")))?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(record.import_id, Entry { record, expires_at });
        Ok(())
    }

    async fn get(&self, import_id: ImportId) -> Result<Option<ImportStatusRecord>, CoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(&import_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.record.clone()))
    }

    async fn delete(&self, import_id: ImportId) -> Result<bool, CoreError> {
        Ok(self.entries.write().await.remove(&import_id).is_some())
    }
}
