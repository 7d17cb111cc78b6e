//! Shared fixtures for pipeline integration tests.
//!
//! Everything runs in-process: the deterministic probe, the in-memory
//! destination store and the in-memory status store.

#![allow(dead_code)]

use std::sync::Arc;

use wayfarer_core::destination::{DestinationRecord, REQUIRED_COLUMNS, TEMPLATE_ROW};
use wayfarer_core::options::ImportLimits;
use wayfarer_core::tokenizer::{tokenize, write_record};
use wayfarer_core::validation::evaluator::SchemaRegistry;
use wayfarer_events::EventBus;
use wayfarer_pipeline::{
    ImportPipeline, InMemoryDestinationStore, InMemoryImportStatusStore, PipelineConfig,
    StaticResourceProbe,
};

pub struct Harness {
    pub pipeline: ImportPipeline,
    pub store: Arc<InMemoryDestinationStore>,
    pub statuses: Arc<InMemoryImportStatusStore>,
    pub probe: Arc<StaticResourceProbe>,
    pub events: Arc<EventBus>,
}

/// A pipeline whose probe reports every image as a small reachable JPEG.
pub fn harness() -> Harness {
    harness_with(StaticResourceProbe::accessible(), PipelineConfig::default())
}

pub fn harness_with(probe: StaticResourceProbe, config: PipelineConfig) -> Harness {
    let store = Arc::new(InMemoryDestinationStore::new());
    let statuses = Arc::new(InMemoryImportStatusStore::new());
    let probe = Arc::new(probe);
    let events = Arc::new(EventBus::default());
    let pipeline = ImportPipeline::new(
        config,
        probe.clone(),
        store.clone(),
        store.clone(),
        statuses.clone(),
    )
    .with_events(events.clone());

    Harness {
        pipeline,
        store,
        statuses,
        probe,
        events,
    }
}

/// The example row's values, ready to override.
pub fn template_values() -> Vec<String> {
    TEMPLATE_ROW.iter().map(|v| v.to_string()).collect()
}

/// Template values with `column` replaced.
pub fn with_field(mut values: Vec<String>, column: &str, value: &str) -> Vec<String> {
    let idx = REQUIRED_COLUMNS
        .iter()
        .position(|c| *c == column)
        .unwrap_or_else(|| panic!("unknown column {column}"));
    values[idx] = value.to_string();
    values
}

/// A template row placed at the given name and coordinates.
pub fn destination(name_en: &str, lat: &str, lng: &str) -> Vec<String> {
    let values = with_field(template_values(), "name_en", name_en);
    let values = with_field(values, "lat", lat);
    with_field(values, "lng", lng)
}

/// A full import file: canonical header plus `rows`.
pub fn csv_file(rows: &[Vec<String>]) -> Vec<u8> {
    let mut lines = vec![write_record(REQUIRED_COLUMNS)];
    lines.extend(rows.iter().map(|values| write_record(values)));
    let mut out = lines.join("\n");
    out.push('\n');
    out.into_bytes()
}

/// The storage record a clean row would produce.
pub fn record_for(values: &[String]) -> DestinationRecord {
    let data = csv_file(&[values.to_vec()]);
    let raw = tokenize(&data).expect("fixture must tokenize").remove(0);
    let candidate = SchemaRegistry::destinations(&ImportLimits::default())
        .evaluate(&raw)
        .candidate()
        .expect("fixture must be valid");
    DestinationRecord::from(&candidate)
}
