//! Import status records for post-commit lookup.

use serde::{Deserialize, Serialize};

use crate::types::{ImportId, Timestamp};

pub const IMPORT_STATUS_PROCESSING: &str = "processing";
pub const IMPORT_STATUS_COMPLETED: &str = "completed";
pub const IMPORT_STATUS_FAILED: &str = "failed";

/// Lifecycle of a committed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => IMPORT_STATUS_PROCESSING,
            Self::Completed => IMPORT_STATUS_COMPLETED,
            Self::Failed => IMPORT_STATUS_FAILED,
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            IMPORT_STATUS_PROCESSING => Some(Self::Processing),
            IMPORT_STATUS_COMPLETED => Some(Self::Completed),
            IMPORT_STATUS_FAILED => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What a status lookup returns for an import id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusRecord {
    pub import_id: ImportId,
    pub status: ImportStatus,
    /// SHA-256 of the uploaded bytes.
    pub file_hash: String,
    pub total_rows: usize,
    pub written_rows: usize,
    pub skipped_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ImportStatusRecord {
    /// A fresh record in `processing`.
    pub fn processing(import_id: ImportId, file_hash: impl Into<String>, total_rows: usize) -> Self {
        let now = chrono::Utc::now();
        Self {
            import_id,
            status: ImportStatus::Processing,
            file_hash: file_hash.into(),
            total_rows,
            written_rows: 0,
            skipped_rows: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed(mut self, written_rows: usize, skipped_rows: usize) -> Self {
        self.status = ImportStatus::Completed;
        self.written_rows = written_rows;
        self.skipped_rows = skipped_rows;
        self.updated_at = chrono::Utc::now();
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = ImportStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = chrono::Utc::now();
        self
    }
}
