//! The import pipeline entry point.
//!
//! `tokenize → per-row validation (bounded, order-preserving) → aggregate →
//! gated commit`. Every failure is folded into the returned
//! [`ImportResult`]; nothing here returns `Err` to the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use wayfarer_core::collaborators::{
    DuplicateIndexProvider, ImportStatusStore, PersistenceSink, ResourceProbe,
};
use wayfarer_core::error::CoreError;
use wayfarer_core::hashing::sha256_hex;
use wayfarer_core::import_status::ImportStatusRecord;
use wayfarer_core::options::ImportOptions;
use wayfarer_core::tokenizer::tokenize;
use wayfarer_core::types::ImportId;
use wayfarer_core::validation::evaluator::SchemaRegistry;
use wayfarer_core::validation::import_preview::{aggregate, ImportResult, RowOutcome};
use wayfarer_events::bus::{EVENT_IMPORT_COMMITTED, EVENT_IMPORT_FAILED, EVENT_IMPORT_VALIDATED};
use wayfarer_events::{EventBus, ImportEvent};

use crate::committer::{CommitError, ImportCommitter};
use crate::config::PipelineConfig;
use crate::row::RowValidator;

pub struct ImportPipeline {
    config: PipelineConfig,
    registry: SchemaRegistry,
    probe: Arc<dyn ResourceProbe>,
    index_provider: Arc<dyn DuplicateIndexProvider>,
    status_store: Arc<dyn ImportStatusStore>,
    committer: ImportCommitter,
    events: Option<Arc<EventBus>>,
}

impl ImportPipeline {
    pub fn new(
        config: PipelineConfig,
        probe: Arc<dyn ResourceProbe>,
        index_provider: Arc<dyn DuplicateIndexProvider>,
        sink: Arc<dyn PersistenceSink>,
        status_store: Arc<dyn ImportStatusStore>,
    ) -> Self {
        let committer = ImportCommitter::new(sink, status_store.clone(), config.status_ttl);
        Self {
            registry: SchemaRegistry::destinations(&config.limits),
            config,
            probe,
            index_provider,
            status_store,
            committer,
            events: None,
        }
    }

    /// Publish analytics events to `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Validate `data` and, when requested and clean, commit it.
    pub async fn run(&self, data: &[u8], options: &ImportOptions) -> ImportResult {
        let started = Instant::now();
        match AssertUnwindSafe(self.execute(data, options, started))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "Import pipeline panicked");
                self.publish(ImportEvent::new(EVENT_IMPORT_FAILED).with_payload(
                    serde_json::json!({ "stage": "internal", "error": message }),
                ));
                ImportResult::file_failure(format!("Internal error: {message}"), started)
            }
        }
    }

    /// [`run`](Self::run), abandoned when `cancel` fires.
    ///
    /// A run cancelled mid-commit may still have written: the sink's
    /// transaction either landed before the drop or never did.
    pub async fn run_with_cancel(
        &self,
        data: &[u8],
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> ImportResult {
        let started = Instant::now();
        tokio::select! {
            result = self.run(data, options) => result,
            _ = cancel.cancelled() => {
                tracing::warn!("Import cancelled");
                ImportResult::file_failure("Import cancelled", started)
            }
        }
    }

    /// [`run`](Self::run), abandoned after `limit`.
    pub async fn run_with_timeout(
        &self,
        data: &[u8],
        options: &ImportOptions,
        limit: Duration,
    ) -> ImportResult {
        let started = Instant::now();
        match tokio::time::timeout(limit, self.run(data, options)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(limit_ms = limit.as_millis() as u64, "Import timed out");
                ImportResult::file_failure(
                    format!("Import timed out after {} ms", limit.as_millis()),
                    started,
                )
            }
        }
    }

    /// Status of a committed import, `None` if unknown or expired.
    pub async fn import_status(
        &self,
        import_id: ImportId,
    ) -> Result<Option<ImportStatusRecord>, CoreError> {
        import_status(self.status_store.as_ref(), import_id).await
    }

    async fn execute(&self, data: &[u8], options: &ImportOptions, started: Instant) -> ImportResult {
        let limits = &self.config.limits;
        let file_hash = sha256_hex(data);

        let (options, adjusted) = options.normalized();
        if let Some(note) = adjusted {
            tracing::warn!(%file_hash, "{note}");
        }

        if data.len() > limits.max_file_bytes {
            return self.reject(
                format!(
                    "File is {} bytes; the maximum is {} bytes",
                    data.len(),
                    limits.max_file_bytes
                ),
                &file_hash,
                started,
            );
        }

        let rows = match tokenize(data) {
            Ok(rows) => rows,
            Err(e) => return self.reject(e.to_string(), &file_hash, started),
        };
        if rows.len() > limits.max_rows {
            return self.reject(
                format!(
                    "File has {} data rows; the maximum is {}",
                    rows.len(),
                    limits.max_rows
                ),
                &file_hash,
                started,
            );
        }

        let index = match self.index_provider.load_index().await {
            Ok(index) => index,
            Err(e) => {
                return self.reject(
                    format!("Could not load existing destinations: {e}"),
                    &file_hash,
                    started,
                )
            }
        };

        tracing::debug!(
            %file_hash,
            rows = rows.len(),
            known = index.len(),
            batch_size = options.batch_size,
            "Validating rows"
        );

        let validator = RowValidator {
            registry: &self.registry,
            limits,
            probe: self.probe.clone(),
            probe_timeout: self.config.probe_timeout,
            index: &index,
        };
        let outcomes: Vec<RowOutcome> = futures::stream::iter(rows)
            .map(|raw| validator.validate(raw))
            .buffered(options.batch_size)
            .collect()
            .await;

        let mut result = aggregate(outcomes, &options, started);
        self.publish(
            ImportEvent::new(EVENT_IMPORT_VALIDATED)
                .with_file_hash(file_hash.as_str())
                .with_payload(serde_json::json!({
                    "summary": &result.summary,
                    "validateOnly": options.validate_only,
                })),
        );

        if options.validate_only {
            return result;
        }

        let previews = result.preview.take().unwrap_or_default();
        match self
            .committer
            .commit(&previews, result.errors.len(), &options, &file_hash)
            .await
        {
            Ok(report) => {
                result.import_id = Some(report.import_id);
                self.publish(
                    ImportEvent::new(EVENT_IMPORT_COMMITTED)
                        .with_import_id(report.import_id)
                        .with_file_hash(file_hash.as_str())
                        .with_payload(serde_json::json!({
                            "writtenRows": report.written_rows,
                            "skippedRows": report.skipped_rows,
                        })),
                );
            }
            Err(CommitError::Blocked(count)) => {
                tracing::info!(%file_hash, errors = count, "Commit skipped; file has errors");
            }
            Err(CommitError::ValidateOnly) => {}
            Err(CommitError::Sink { import_id, source }) => {
                let message = format!("Commit failed: {source}");
                self.publish(
                    ImportEvent::new(EVENT_IMPORT_FAILED)
                        .with_import_id(import_id)
                        .with_file_hash(file_hash.as_str())
                        .with_payload(serde_json::json!({ "stage": "commit", "error": &message })),
                );
                return ImportResult::file_failure(message, started);
            }
        }

        result.summary.processing_time_ms = elapsed_ms(started);
        result
    }

    fn reject(&self, message: String, file_hash: &str, started: Instant) -> ImportResult {
        tracing::warn!(%file_hash, error = %message, "File rejected");
        self.publish(
            ImportEvent::new(EVENT_IMPORT_FAILED)
                .with_file_hash(file_hash)
                .with_payload(serde_json::json!({ "stage": "file", "error": &message })),
        );
        ImportResult::file_failure(message, started)
    }

    fn publish(&self, event: ImportEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

/// Look up a committed import in `store`.
pub async fn import_status(
    store: &dyn ImportStatusStore,
    import_id: ImportId,
) -> Result<Option<ImportStatusRecord>, CoreError> {
    store.get(import_id).await
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
