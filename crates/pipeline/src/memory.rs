//! Destination store held in process memory.
//!
//! Behaves like the database store: identity keys are unique and a write
//! set lands all-or-nothing. Used by tests and by offline CLI runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use wayfarer_core::collaborators::{DuplicateIndexProvider, PersistenceSink};
use wayfarer_core::destination::{DestinationRecord, DestinationWrite};
use wayfarer_core::duplicate_detection::{DuplicateIndex, ExistingDestination};
use wayfarer_core::error::CoreError;
use wayfarer_core::types::{DbId, ImportId};

/// A stored destination and the import that last wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDestination {
    pub id: DbId,
    pub record: DestinationRecord,
    pub import_id: Option<ImportId>,
}

#[derive(Debug, Clone, Default)]
struct State {
    rows: BTreeMap<DbId, StoredDestination>,
    next_id: DbId,
}

impl State {
    fn holder_of(&self, identity_key: &str) -> Option<DbId> {
        self.rows
            .values()
            .find(|d| d.record.identity_key == identity_key)
            .map(|d| d.id)
    }

    fn apply(&mut self, import_id: ImportId, write: &DestinationWrite) -> Result<(), CoreError> {
        let record = write.record();
        match write {
            DestinationWrite::Create { .. } => {
                if let Some(holder) = self.holder_of(&record.identity_key) {
                    return Err(conflict(write.row(), &record.name_en, holder));
                }
                self.next_id += 1;
                let id = self.next_id;
                self.rows.insert(
                    id,
                    StoredDestination {
                        id,
                        record: record.clone(),
                        import_id: Some(import_id),
                    },
                );
            }
            DestinationWrite::Overwrite { existing_id, .. } => {
                if !self.rows.contains_key(existing_id) {
                    return Err(CoreError::NotFound {
                        entity: "Destination",
                        id: *existing_id,
                    });
                }
                if let Some(holder) = self.holder_of(&record.identity_key) {
                    if holder != *existing_id {
                        return Err(conflict(write.row(), &record.name_en, holder));
                    }
                }
                self.rows.insert(
                    *existing_id,
                    StoredDestination {
                        id: *existing_id,
                        record: record.clone(),
                        import_id: Some(import_id),
                    },
                );
            }
        }
        Ok(())
    }
}

fn conflict(row: usize, name_en: &str, holder: DbId) -> CoreError {
    CoreError::Conflict(format!(
        "Row {row}: '{name_en}' already exists as destination {holder}"
    ))
}

#[derive(Debug, Default)]
pub struct InMemoryDestinationStore {
    state: RwLock<State>,
}

impl InMemoryDestinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed stored destinations, bypassing import bookkeeping.
    pub async fn seed(&self, records: impl IntoIterator<Item = DestinationRecord>) -> Vec<DbId> {
        let mut state = self.state.write().await;
        records
            .into_iter()
            .map(|record| {
                state.next_id += 1;
                let id = state.next_id;
                state.rows.insert(
                    id,
                    StoredDestination {
                        id,
                        record,
                        import_id: None,
                    },
                );
                id
            })
            .collect()
    }

    /// All stored destinations in id order.
    pub async fn all(&self) -> Vec<StoredDestination> {
        self.state.read().await.rows.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.rows.len()
    }
}

#[async_trait]
impl DuplicateIndexProvider for InMemoryDestinationStore {
    async fn load_index(&self) -> Result<DuplicateIndex, CoreError> {
        let state = self.state.read().await;
        Ok(DuplicateIndex::from_existing(state.rows.values().map(|d| {
            ExistingDestination {
                id: d.id,
                name_en: d.record.name_en.clone(),
                name_th: d.record.name_th.clone(),
                lat: d.record.lat,
                lng: d.record.lng,
            }
        })))
    }
}

#[async_trait]
impl PersistenceSink for InMemoryDestinationStore {
    async fn write(&self, import_id: ImportId, writes: &[DestinationWrite]) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        // Stage on a copy; publish only if every write applied.
        let mut staged = state.clone();
        for write in writes {
            staged.apply(import_id, write)?;
        }
        *state = staged;
        Ok(())
    }
}
