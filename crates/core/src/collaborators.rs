//! Interfaces to the collaborators the import pipeline depends on.
//!
//! The pipeline never reaches a network or a database directly; it is
//! handed implementations of these traits.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::destination::DestinationWrite;
use crate::duplicate_detection::DuplicateIndex;
use crate::error::CoreError;
use crate::import_status::ImportStatusRecord;
use crate::types::ImportId;

/// What an accessibility probe learned about a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ProbeReport {
    pub fn accessible(size_bytes: Option<u64>, content_type: Option<&str>) -> Self {
        Self {
            accessible: true,
            size_bytes,
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn inaccessible() -> Self {
        Self {
            accessible: false,
            size_bytes: None,
            content_type: None,
        }
    }
}

/// Checks whether a referenced resource can be fetched.
///
/// Returning `Err` means the probe itself failed (network error, DNS),
/// which is distinct from a clean "not accessible" report.
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeReport, CoreError>;
}

/// Supplies the duplicate index for one run.
#[async_trait]
pub trait DuplicateIndexProvider: Send + Sync {
    async fn load_index(&self) -> Result<DuplicateIndex, CoreError>;
}

/// Durable destination store. Must apply the whole write set atomically:
/// either every write lands or none does.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn write(&self, import_id: ImportId, writes: &[DestinationWrite]) -> Result<(), CoreError>;
}

/// Import status records keyed by import id, each with a time-to-live.
#[async_trait]
pub trait ImportStatusStore: Send + Sync {
    async fn put(&self, record: ImportStatusRecord, ttl: Duration) -> Result<(), CoreError>;

    /// Returns `None` for unknown or expired ids.
    async fn get(&self, import_id: ImportId) -> Result<Option<ImportStatusRecord>, CoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, import_id: ImportId) -> Result<bool, CoreError>;
}
