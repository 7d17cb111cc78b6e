//! Bulk destination import pipeline.
//!
//! Wires the pure stages from `wayfarer-core` to their collaborators: an
//! accessibility probe, a duplicate-index provider, a persistence sink and
//! an import-status store. [`ImportPipeline::run`] is the single entry point.

pub mod committer;
pub mod config;
pub mod memory;
pub mod probe;
pub mod row;
pub mod runner;
pub mod status_store;

pub use committer::{CommitError, CommitReport, ImportCommitter};
pub use config::PipelineConfig;
pub use memory::InMemoryDestinationStore;
pub use probe::{HttpResourceProbe, ProbeError, StaticResourceProbe, StaticResponse};
pub use runner::{import_status, ImportPipeline};
pub use status_store::InMemoryImportStatusStore;
