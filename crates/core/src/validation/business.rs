//! Business rules that need context beyond a single field's syntax.
//!
//! These run only on fields that already passed the schema evaluator.
//! Everything here is advisory except an image that is cleanly reported
//! as unreachable, which is the one business rule that blocks a commit.

use serde::{Deserialize, Serialize};

use super::evaluator::TypedFields;
use super::rules::ValidationIssue;
use crate::collaborators::ProbeReport;
use crate::destination::{COL_IMAGE_URL, COL_INSTAGRAM_SCORE, COL_MOOD_TAGS};
use crate::options::ImportLimits;

/// How an accessibility probe call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The probe answered.
    Report(ProbeReport),
    /// The probe itself failed (network, DNS, unexpected status).
    Failed { reason: String },
    /// No answer within the per-call timeout.
    TimedOut { timeout_ms: u64 },
}

/// Apply business rules to the typed fields of one row.
///
/// `probe` is the outcome for `fields.image_url`; pass `None` when the URL
/// did not pass schema validation and was therefore never probed.
pub fn evaluate_business_rules(
    row: usize,
    fields: &TypedFields,
    probe: Option<&ProbeOutcome>,
    limits: &ImportLimits,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let (Some(url), Some(outcome)) = (fields.image_url.as_deref(), probe) {
        issues.extend(evaluate_accessibility(row, url, outcome, limits));
    }

    if let Some(tags) = &fields.mood_tags {
        if tags.len() > limits.recommended_mood_tags {
            issues.push(ValidationIssue::warning(
                row,
                COL_MOOD_TAGS,
                format!(
                    "{} mood tags; at most {} are recommended",
                    tags.len(),
                    limits.recommended_mood_tags
                ),
            )
            .with_value(tags.join(",")));
        }
    }

    if let Some(score) = fields.instagram_score {
        if score < limits.low_popularity_threshold {
            issues.push(
                ValidationIssue::warning(
                    row,
                    COL_INSTAGRAM_SCORE,
                    format!(
                        "Score below {} flags this destination for curator review",
                        limits.low_popularity_threshold
                    ),
                )
                .with_value(score.to_string()),
            );
        }
    }

    issues
}

fn evaluate_accessibility(
    row: usize,
    url: &str,
    outcome: &ProbeOutcome,
    limits: &ImportLimits,
) -> Vec<ValidationIssue> {
    let issue = |message: String, blocking: bool| {
        let issue = if blocking {
            ValidationIssue::error(row, COL_IMAGE_URL, message)
        } else {
            ValidationIssue::warning(row, COL_IMAGE_URL, message)
        };
        issue.with_value(url)
    };

    match outcome {
        ProbeOutcome::Report(report) if !report.accessible => {
            vec![issue("Image is not accessible".to_string(), true)]
        }
        ProbeOutcome::Report(report) => {
            let mut issues = Vec::new();
            if let Some(size) = report.size_bytes.filter(|s| *s > limits.max_image_bytes) {
                issues.push(issue(
                    format!(
                        "Image is {size} bytes, larger than the recommended {} bytes",
                        limits.max_image_bytes
                    ),
                    false,
                ));
            }
            if let Some(ct) = report
                .content_type
                .as_deref()
                .filter(|ct| !ct.trim().to_lowercase().starts_with("image/"))
            {
                issues.push(issue(
                    format!("Resource content type is '{ct}', expected an image"),
                    false,
                ));
            }
            issues
        }
        ProbeOutcome::Failed { reason } => vec![issue(
            format!("Image accessibility could not be verified: {reason}"),
            false,
        )],
        ProbeOutcome::TimedOut { timeout_ms } => vec![issue(
            format!("Image accessibility check timed out after {timeout_ms} ms"),
            false,
        )],
    }
}
