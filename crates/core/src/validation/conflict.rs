//! Duplicate resolution and commit planning.
//!
//! Turns the previewed rows of a clean run into the write set a
//! persistence sink applies, resolving each duplicate per the caller's
//! `overwrite` / `skip_duplicates` options.

use serde::{Deserialize, Serialize};

use super::import_preview::{RowData, RowPreview, RowStatus};
use crate::destination::{DestinationRecord, DestinationWrite};
use crate::options::ImportOptions;

/// What to do with a row that matches an existing destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAction {
    /// Leave the stored destination alone and drop the row.
    Skip,
    /// Replace the stored destination with the row.
    Overwrite,
    /// Insert the row anyway; the store's uniqueness constraint decides.
    Create,
}

impl DuplicateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Create => "create",
        }
    }

    /// The action the options select. `overwrite` takes precedence.
    pub fn from_options(options: &ImportOptions) -> Self {
        if options.overwrite {
            Self::Overwrite
        } else if options.skip_duplicates {
            Self::Skip
        } else {
            Self::Create
        }
    }

    /// Whether a commit leaves a duplicate row out. A repeat of an earlier
    /// row in the same file has nothing stored to overwrite, so only
    /// `Create` writes it.
    pub fn leaves_out(&self, repeats_earlier_row: bool) -> bool {
        match self {
            Self::Skip => true,
            Self::Overwrite => repeats_earlier_row,
            Self::Create => false,
        }
    }
}

/// Rows left out of the write set, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// The write set for one commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommitPlan {
    pub writes: Vec<DestinationWrite>,
    pub skipped: Vec<SkippedRow>,
}

/// Plan the commit for aggregated rows.
///
/// Rows in `error` status are never written. Callers gate on an empty
/// error list before planning, so in practice none reach this point.
pub fn plan_commit(rows: &[RowPreview], options: &ImportOptions) -> CommitPlan {
    let action = DuplicateAction::from_options(options);
    let mut plan = CommitPlan::default();

    for preview in rows {
        let candidate = match (&preview.status, &preview.data) {
            (RowStatus::Error, _) | (_, RowData::Raw(_)) => {
                plan.skipped.push(SkippedRow {
                    row: preview.row,
                    reason: "row has validation errors".to_string(),
                });
                continue;
            }
            (_, RowData::Candidate(candidate)) => candidate,
        };
        if let Some(first) = preview.duplicate_of_row {
            if action.leaves_out(true) {
                plan.skipped.push(SkippedRow {
                    row: preview.row,
                    reason: format!("duplicate of row {first}"),
                });
                continue;
            }
        }
        let record = DestinationRecord::from(candidate.as_ref());

        let write = match (&preview.existing_match, action) {
            (None, _) | (Some(_), DuplicateAction::Create) => DestinationWrite::Create {
                row: preview.row,
                record,
            },
            (Some(existing), DuplicateAction::Overwrite) => DestinationWrite::Overwrite {
                row: preview.row,
                existing_id: existing.id,
                record,
            },
            (Some(existing), DuplicateAction::Skip) => {
                plan.skipped.push(SkippedRow {
                    row: preview.row,
                    reason: format!("duplicate of destination {}", existing.id),
                });
                continue;
            }
        };
        plan.writes.push(write);
    }

    plan
}
