//! Per-row previews and the aggregated import result.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::conflict::DuplicateAction;
use super::rules::{ValidationIssue, ValidationSeverity};
use crate::destination::{DestinationCandidate, COL_NAME_EN};
use crate::duplicate_detection::ExistingMatch;
use crate::options::ImportOptions;
use crate::tokenizer::{write_record, RawRow};
use crate::types::ImportId;

/// Outcome of one row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Warning,
    Error,
}

impl RowStatus {
    /// Errors dominate warnings; a row with neither is valid.
    pub fn from_issues(errors: &[ValidationIssue], warnings: &[ValidationIssue]) -> Self {
        if !errors.is_empty() {
            Self::Error
        } else if !warnings.is_empty() {
            Self::Warning
        } else {
            Self::Valid
        }
    }
}

/// The typed candidate when schema validation passed, the raw row otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowData {
    Candidate(Box<DestinationCandidate>),
    Raw(RawRow),
}

/// What the validation stages produced for one row, before aggregation.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub raw: RawRow,
    pub candidate: Option<DestinationCandidate>,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// Set when the name and both coordinates parsed.
    pub identity_key: Option<String>,
    pub existing_match: Option<ExistingMatch>,
}

impl RowOutcome {
    /// Freeze into a preview: surface the duplicate warning and derive status.
    pub fn into_preview(self) -> RowPreview {
        self.preview(None)
    }

    fn preview(self, duplicate_of_row: Option<usize>) -> RowPreview {
        let row = self.raw.row;
        let mut warnings = self.warnings;
        let message = match (&self.existing_match, duplicate_of_row) {
            (Some(existing), _) => Some(format!(
                "Duplicate of existing destination {} ({})",
                existing.id, existing.name_en
            )),
            (None, Some(first)) => Some(format!("Duplicate of row {first} in this file")),
            (None, None) => None,
        };
        if let Some(message) = message {
            let name_en = match &self.candidate {
                Some(c) => c.name_en.clone(),
                None => self.raw.get(COL_NAME_EN).unwrap_or_default().to_string(),
            };
            warnings.push(ValidationIssue::warning(row, COL_NAME_EN, message).with_value(name_en));
        }

        let status = RowStatus::from_issues(&self.errors, &warnings);
        let data = match self.candidate {
            Some(candidate) => RowData::Candidate(Box::new(candidate)),
            None => RowData::Raw(self.raw),
        };

        RowPreview {
            row,
            data,
            status,
            errors: self.errors,
            warnings,
            is_duplicate: self.existing_match.is_some() || duplicate_of_row.is_some(),
            existing_match: self.existing_match,
            duplicate_of_row,
        }
    }
}

/// Preview entry for a single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPreview {
    pub row: usize,
    pub data: RowData,
    pub status: RowStatus,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_match: Option<ExistingMatch>,
    /// Earlier row of the same file with the same identity key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of_row: Option<usize>,
}

/// A row that collides with a stored destination or an earlier row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateEntry {
    pub row: usize,
    pub name_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<ExistingMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of_row: Option<usize>,
    pub suggested_action: DuplicateAction,
}

/// Counts over all rows of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub successful_rows: usize,
    pub error_rows: usize,
    pub warning_rows: usize,
    pub duplicate_rows: usize,
    /// Duplicate rows without errors that a commit would leave out.
    pub skipped_rows: usize,
    pub processing_time_ms: u64,
}

/// The sole return value of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub summary: ImportSummary,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub duplicates: Vec<DuplicateEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Vec<RowPreview>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<ImportId>,
}

impl ImportResult {
    /// A run that failed at the file level: one error, no rows.
    pub fn file_failure(message: impl Into<String>, started: Instant) -> Self {
        Self {
            summary: ImportSummary {
                processing_time_ms: elapsed_ms(started),
                ..ImportSummary::default()
            },
            errors: vec![ValidationIssue::file(message)],
            warnings: Vec::new(),
            duplicates: Vec::new(),
            preview: Some(Vec::new()),
            import_id: None,
        }
    }

    /// All errors then all warnings as CSV (`row,field,severity,message,value`).
    pub fn issues_csv(&self) -> String {
        let mut lines = vec![write_record(["row", "field", "severity", "message", "value"])];
        for issue in self.errors.iter().chain(&self.warnings) {
            lines.push(write_record([
                issue.row.to_string().as_str(),
                issue.field.as_str(),
                issue.severity.as_str(),
                issue.message.as_str(),
                issue.value.as_deref().unwrap_or(""),
            ]));
        }
        let mut csv = lines.join("\n");
        csv.push('\n');
        csv
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Merge row outcomes into one result in a single pass.
///
/// Rows are ordered by row number first, so callers may hand outcomes
/// over in completion order. A row whose identity key already appeared
/// earlier in the file, and that matches nothing stored, is flagged as a
/// duplicate of that earlier row.
pub fn aggregate(mut outcomes: Vec<RowOutcome>, options: &ImportOptions, started: Instant) -> ImportResult {
    outcomes.sort_by_key(|o| o.raw.row);
    let action = DuplicateAction::from_options(options);

    let mut summary = ImportSummary {
        total_rows: outcomes.len(),
        ..ImportSummary::default()
    };
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut duplicates = Vec::new();
    let mut previews = Vec::with_capacity(outcomes.len());
    let mut first_rows: HashMap<String, usize> = HashMap::new();

    for mut outcome in outcomes {
        let earlier = match outcome.identity_key.take().map(|k| first_rows.entry(k)) {
            Some(Entry::Occupied(first)) => Some(*first.get()),
            Some(Entry::Vacant(slot)) => {
                slot.insert(outcome.raw.row);
                None
            }
            None => None,
        };
        let duplicate_of_row = earlier.filter(|_| outcome.existing_match.is_none());
        let preview = outcome.preview(duplicate_of_row);

        match preview.status {
            RowStatus::Valid => summary.successful_rows += 1,
            RowStatus::Warning => summary.warning_rows += 1,
            RowStatus::Error => summary.error_rows += 1,
        }
        errors.extend(preview.errors.iter().cloned());
        warnings.extend(preview.warnings.iter().cloned());

        if preview.is_duplicate {
            summary.duplicate_rows += 1;
            if preview.status != RowStatus::Error
                && action.leaves_out(preview.duplicate_of_row.is_some())
            {
                summary.skipped_rows += 1;
            }
            let name_en = match &preview.data {
                RowData::Candidate(c) => c.name_en.clone(),
                RowData::Raw(raw) => raw.get(COL_NAME_EN).unwrap_or_default().to_string(),
            };
            duplicates.push(DuplicateEntry {
                row: preview.row,
                name_en,
                existing: preview.existing_match.clone(),
                duplicate_of_row: preview.duplicate_of_row,
                suggested_action: DuplicateAction::Skip,
            });
        }

        previews.push(preview);
    }

    debug_assert!(errors.iter().all(|i| i.severity == ValidationSeverity::Error));
    summary.processing_time_ms = elapsed_ms(started);

    ImportResult {
        summary,
        errors,
        warnings,
        duplicates,
        preview: Some(previews),
        import_id: None,
    }
}
