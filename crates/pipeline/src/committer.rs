//! Gated commit of a validated run.

use std::sync::Arc;
use std::time::Duration;

use wayfarer_core::collaborators::{ImportStatusStore, PersistenceSink};
use wayfarer_core::error::CoreError;
use wayfarer_core::import_status::ImportStatusRecord;
use wayfarer_core::options::ImportOptions;
use wayfarer_core::types::{new_import_id, ImportId};
use wayfarer_core::validation::conflict::plan_commit;
use wayfarer_core::validation::import_preview::RowPreview;

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub import_id: ImportId,
    pub written_rows: usize,
    pub skipped_rows: usize,
}

/// Why a commit was not applied.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Commit not requested (validateOnly is set)")]
    ValidateOnly,

    #[error("{0} validation error(s) block the commit")]
    Blocked(usize),

    /// The sink rejected the write set; nothing was written.
    #[error("Commit failed: {source}")]
    Sink {
        import_id: ImportId,
        #[source]
        source: CoreError,
    },
}

pub struct ImportCommitter {
    sink: Arc<dyn PersistenceSink>,
    status_store: Arc<dyn ImportStatusStore>,
    status_ttl: Duration,
}

impl ImportCommitter {
    pub fn new(
        sink: Arc<dyn PersistenceSink>,
        status_store: Arc<dyn ImportStatusStore>,
        status_ttl: Duration,
    ) -> Self {
        Self {
            sink,
            status_store,
            status_ttl,
        }
    }

    /// Write the rows of a run whose global error list is `error_count` long.
    ///
    /// Nothing is written unless `validate_only` is off and there are no
    /// errors. An empty write set still succeeds and yields an import id.
    pub async fn commit(
        &self,
        rows: &[RowPreview],
        error_count: usize,
        options: &ImportOptions,
        file_hash: &str,
    ) -> Result<CommitReport, CommitError> {
        if options.validate_only {
            return Err(CommitError::ValidateOnly);
        }
        if error_count > 0 {
            return Err(CommitError::Blocked(error_count));
        }

        let plan = plan_commit(rows, options);
        let import_id = new_import_id();
        let record = ImportStatusRecord::processing(import_id, file_hash, rows.len());
        self.put_status(record.clone()).await;

        tracing::info!(
            %import_id,
            writes = plan.writes.len(),
            skipped = plan.skipped.len(),
            "Committing import"
        );

        if !plan.writes.is_empty() {
            if let Err(source) = self.sink.write(import_id, &plan.writes).await {
                tracing::error!(%import_id, error = %source, "Import commit failed");
                self.put_status(record.failed(source.to_string())).await;
                return Err(CommitError::Sink { import_id, source });
            }
        }

        let report = CommitReport {
            import_id,
            written_rows: plan.writes.len(),
            skipped_rows: plan.skipped.len(),
        };
        self.put_status(record.completed(report.written_rows, report.skipped_rows))
            .await;

        tracing::info!(
            %import_id,
            written = report.written_rows,
            skipped = report.skipped_rows,
            "Import committed"
        );
        Ok(report)
    }

    // Status bookkeeping must not decide whether the writes land.
    async fn put_status(&self, record: ImportStatusRecord) {
        let import_id = record.import_id;
        if let Err(e) = self.status_store.put(record, self.status_ttl).await {
            tracing::warn!(%import_id, error = %e, "Failed to record import status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use wayfarer_core::destination::DestinationWrite;
    use wayfarer_core::import_status::ImportStatus;

    use crate::memory::InMemoryDestinationStore;
    use crate::status_store::InMemoryImportStatusStore;

    struct RejectingSink;

    #[async_trait]
    impl PersistenceSink for RejectingSink {
        async fn write(&self, _: ImportId, _: &[DestinationWrite]) -> Result<(), CoreError> {
            Err(CoreError::Storage("disk full".into()))
        }
    }

    fn committer(sink: Arc<dyn PersistenceSink>) -> (ImportCommitter, Arc<InMemoryImportStatusStore>) {
        let statuses = Arc::new(InMemoryImportStatusStore::new());
        (
            ImportCommitter::new(sink, statuses.clone(), Duration::from_secs(60)),
            statuses,
        )
    }

    #[tokio::test]
    async fn validate_only_never_writes() {
        let (committer, statuses) = committer(Arc::new(InMemoryDestinationStore::new()));
        let result = committer.commit(&[], 0, &ImportOptions::default(), "h").await;
        assert_matches!(result, Err(CommitError::ValidateOnly));
        assert!(statuses.is_empty().await);
    }

    #[tokio::test]
    async fn errors_block_commit() {
        let (committer, statuses) = committer(Arc::new(InMemoryDestinationStore::new()));
        let result = committer.commit(&[], 2, &ImportOptions::commit(), "h").await;
        assert_matches!(result, Err(CommitError::Blocked(2)));
        assert!(statuses.is_empty().await);
    }

    #[tokio::test]
    async fn empty_write_set_still_gets_an_id() {
        let (committer, statuses) = committer(Arc::new(RejectingSink));
        let report = committer
            .commit(&[], 0, &ImportOptions::commit(), "h")
            .await
            .unwrap();
        assert_eq!(report.written_rows, 0);
        let status = statuses.get(report.import_id).await.unwrap().unwrap();
        assert_eq!(status.status, ImportStatus::Completed);
    }

    #[tokio::test]
    async fn sink_failure_marks_status_failed() {
        use wayfarer_core::destination::csv_template;
        use wayfarer_core::options::ImportLimits;
        use wayfarer_core::tokenizer::tokenize;
        use wayfarer_core::validation::evaluator::SchemaRegistry;
        use wayfarer_core::validation::import_preview::RowOutcome;

        let raw = tokenize(csv_template().as_bytes()).unwrap().remove(0);
        let schema = SchemaRegistry::destinations(&ImportLimits::default()).evaluate(&raw);
        let preview = RowOutcome {
            raw,
            candidate: schema.candidate(),
            errors: Vec::new(),
            warnings: Vec::new(),
            identity_key: None,
            existing_match: None,
        }
        .into_preview();

        let (committer, statuses) = committer(Arc::new(RejectingSink));
        let err = committer
            .commit(&[preview], 0, &ImportOptions::commit(), "h")
            .await
            .unwrap_err();
        let import_id = assert_matches!(err, CommitError::Sink { import_id, .. } => import_id);
        let status = statuses.get(import_id).await.unwrap().unwrap();
        assert_eq!(status.status, ImportStatus::Failed);
        assert!(status.error.unwrap().contains("disk full"));
    }
}
