//! Models for the `import_jobs` table.

use sqlx::FromRow;
use uuid::Uuid;
use wayfarer_core::error::CoreError;
use wayfarer_core::import_status::{ImportStatus, ImportStatusRecord};
use wayfarer_core::types::Timestamp;

/// A row from the `import_jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct ImportJob {
    pub import_id: Uuid,
    pub status: String,
    pub file_hash: String,
    pub total_rows: i32,
    pub written_rows: i32,
    pub skipped_rows: i32,
    pub error: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportJob {
    pub fn into_record(self) -> Result<ImportStatusRecord, CoreError> {
        let status = ImportStatus::from_str_value(&self.status).ok_or_else(|| {
            CoreError::Storage(format!(
                "import_jobs row {} has unknown status '{}'",
                self.import_id, self.status
            ))
        })?;
        Ok(ImportStatusRecord {
            import_id: self.import_id,
            status,
            file_hash: self.file_hash,
            total_rows: to_count(self.total_rows)?,
            written_rows: to_count(self.written_rows)?,
            skipped_rows: to_count(self.skipped_rows)?,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DTO for inserting or replacing an import job.
#[derive(Debug, Clone)]
pub struct UpsertImportJob {
    pub import_id: Uuid,
    pub status: &'static str,
    pub file_hash: String,
    pub total_rows: i32,
    pub written_rows: i32,
    pub skipped_rows: i32,
    pub error: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl UpsertImportJob {
    pub fn from_record(record: &ImportStatusRecord, expires_at: Timestamp) -> Result<Self, CoreError> {
        Ok(Self {
            import_id: record.import_id,
            status: record.status.as_str(),
            file_hash: record.file_hash.clone(),
            total_rows: to_column(record.total_rows)?,
            written_rows: to_column(record.written_rows)?,
            skipped_rows: to_column(record.skipped_rows)?,
            error: record.error.clone(),
            expires_at,
            created_at: record.created_at,
        })
    }
}

fn to_count(value: i32) -> Result<usize, CoreError> {
    usize::try_from(value).map_err(|_| CoreError::Storage(format!("negative row count {value}")))
}

fn to_column(value: usize) -> Result<i32, CoreError> {
    i32::try_from(value).map_err(|_| CoreError::Validation(format!("row count {value} out of range")))
}
