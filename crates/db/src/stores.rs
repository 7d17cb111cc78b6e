//! Collaborator trait implementations backed by PostgreSQL.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use wayfarer_core::collaborators::{DuplicateIndexProvider, ImportStatusStore, PersistenceSink};
use wayfarer_core::destination::DestinationWrite;
use wayfarer_core::duplicate_detection::{DuplicateIndex, ExistingDestination};
use wayfarer_core::error::CoreError;
use wayfarer_core::import_status::ImportStatusRecord;
use wayfarer_core::types::{ImportId, Timestamp};

use crate::models::import_job::UpsertImportJob;
use crate::repositories::{DestinationRepo, ImportJobRepo};
use crate::DbPool;

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a database error into the domain error.
///
/// Unique violations on `uq_` constraints become `Conflict`; everything else
/// is a `Storage` error.
pub fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    CoreError::Storage(err.to_string())
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

/// Destination store: duplicate index source and persistence sink.
#[derive(Clone)]
pub struct PgDestinationStore {
    pool: DbPool,
}

impl PgDestinationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DuplicateIndexProvider for PgDestinationStore {
    async fn load_index(&self) -> Result<DuplicateIndex, CoreError> {
        let rows = DestinationRepo::list_identities(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        tracing::debug!(count = rows.len(), "Loaded destination identities");
        Ok(DuplicateIndex::from_existing(
            rows.into_iter().map(ExistingDestination::from),
        ))
    }
}

#[async_trait]
impl PersistenceSink for PgDestinationStore {
    async fn write(&self, import_id: ImportId, writes: &[DestinationWrite]) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for write in writes {
            let row = write.row();
            match write {
                DestinationWrite::Create { record, .. } => {
                    DestinationRepo::insert(&mut tx, import_id, record)
                        .await
                        .map_err(|e| with_row(row, map_sqlx_error(e)))?;
                }
                DestinationWrite::Overwrite {
                    existing_id,
                    record,
                    ..
                } => {
                    let found = DestinationRepo::replace(&mut tx, *existing_id, import_id, record)
                        .await
                        .map_err(|e| with_row(row, map_sqlx_error(e)))?;
                    if !found {
                        return Err(CoreError::NotFound {
                            entity: "Destination",
                            id: *existing_id,
                        });
                    }
                }
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::info!(%import_id, writes = writes.len(), "Destination writes committed");
        Ok(())
    }
}

fn with_row(row: usize, err: CoreError) -> CoreError {
    match err {
        CoreError::Conflict(msg) => CoreError::Conflict(format!("Row {row}: {msg}")),
        CoreError::Storage(msg) => CoreError::Storage(format!("Row {row}: {msg}")),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Import status
// ---------------------------------------------------------------------------

/// Import status records in the `import_jobs` table.
#[derive(Clone)]
pub struct PgImportStatusStore {
    pool: DbPool,
}

impl PgImportStatusStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Delete expired records.
    pub async fn purge_expired(&self) -> Result<u64, CoreError> {
        ImportJobRepo::purge_expired(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

fn expiry(now: Timestamp, ttl: Duration) -> Result<Timestamp, CoreError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| CoreError::Validation(format!("status TTL {ttl:?} is out of range")))
}

#[async_trait]
impl ImportStatusStore for PgImportStatusStore {
    async fn put(&self, record: ImportStatusRecord, ttl: Duration) -> Result<(), CoreError> {
        let input = UpsertImportJob::from_record(&record, expiry(Utc::now(), ttl)?)?;
        ImportJobRepo::upsert(&self.pool, &input)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get(&self, import_id: ImportId) -> Result<Option<ImportStatusRecord>, CoreError> {
        ImportJobRepo::find_live(&self.pool, import_id)
            .await
            .map_err(map_sqlx_error)?
            .map(|job| job.into_record())
            .transpose()
    }

    async fn delete(&self, import_id: ImportId) -> Result<bool, CoreError> {
        ImportJobRepo::delete(&self.pool, import_id)
            .await
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn non_database_errors_are_storage_errors() {
        assert_matches!(map_sqlx_error(sqlx::Error::RowNotFound), CoreError::Storage(_));
    }

    #[test]
    fn row_context_is_prefixed() {
        let err = with_row(4, CoreError::Conflict("taken".into()));
        assert_matches!(err, CoreError::Conflict(msg) if msg == "Row 4: taken");
        let err = with_row(4, CoreError::NotFound { entity: "Destination", id: 1 });
        assert_matches!(err, CoreError::NotFound { id: 1, .. });
    }

    #[test]
    fn expiry_adds_ttl() {
        let now = Utc::now();
        let at = expiry(now, Duration::from_secs(90)).unwrap();
        assert_eq!((at - now).num_seconds(), 90);
        assert!(expiry(now, Duration::from_secs(u64::MAX)).is_err());
    }
}
