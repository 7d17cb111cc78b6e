//! Per-row validation: schema, accessibility probe, business rules, and
//! duplicate lookup.

use std::sync::Arc;
use std::time::Duration;

use wayfarer_core::collaborators::ResourceProbe;
use wayfarer_core::duplicate_detection::{identity_key, DuplicateIndex};
use wayfarer_core::options::ImportLimits;
use wayfarer_core::tokenizer::RawRow;
use wayfarer_core::validation::business::{evaluate_business_rules, ProbeOutcome};
use wayfarer_core::validation::evaluator::SchemaRegistry;
use wayfarer_core::validation::import_preview::RowOutcome;

/// Validates single rows against one duplicate index.
pub struct RowValidator<'a> {
    pub registry: &'a SchemaRegistry,
    pub limits: &'a ImportLimits,
    pub probe: Arc<dyn ResourceProbe>,
    pub probe_timeout: Duration,
    pub index: &'a DuplicateIndex,
}

impl RowValidator<'_> {
    pub async fn validate(&self, raw: RawRow) -> RowOutcome {
        let row = raw.row;
        let schema = self.registry.evaluate(&raw);

        let probe_outcome = match schema.fields.image_url.as_deref() {
            Some(url) => Some(self.probe_image(row, url).await),
            None => None,
        };

        let (warnings, mut errors): (Vec<_>, Vec<_>) = evaluate_business_rules(
            row,
            &schema.fields,
            probe_outcome.as_ref(),
            self.limits,
        )
        .into_iter()
        .partition(|issue| !issue.is_error());

        let fields = &schema.fields;
        let key = match (fields.name_en.as_deref(), fields.lat, fields.lng) {
            (Some(name_en), Some(lat), Some(lng)) => Some(identity_key(name_en, lat, lng)),
            _ => None,
        };
        let existing_match = key.as_deref().and_then(|k| self.index.get(k)).cloned();

        let candidate = if errors.is_empty() { schema.candidate() } else { None };
        let mut all_errors = schema.issues;
        all_errors.append(&mut errors);

        RowOutcome {
            raw,
            candidate,
            errors: all_errors,
            warnings,
            identity_key: key,
            existing_match,
        }
    }

    async fn probe_image(&self, row: usize, url: &str) -> ProbeOutcome {
        match tokio::time::timeout(self.probe_timeout, self.probe.probe(url)).await {
            Ok(Ok(report)) => ProbeOutcome::Report(report),
            Ok(Err(e)) => {
                tracing::warn!(row, url, error = %e, "Image probe failed");
                ProbeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(row, url, "Image probe timed out");
                ProbeOutcome::TimedOut {
                    timeout_ms: u64::try_from(self.probe_timeout.as_millis()).unwrap_or(u64::MAX),
                }
            }
        }
    }
}
