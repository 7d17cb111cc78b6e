//! End-to-end validation runs (`validateOnly`) through `ImportPipeline::run`.

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use common::{csv_file, destination, harness, harness_with, template_values, with_field};
use wayfarer_core::collaborators::ProbeReport;
use wayfarer_core::destination::{csv_template, REQUIRED_COLUMNS, TEMPLATE_ROW};
use wayfarer_core::options::{ImportLimits, ImportOptions};
use wayfarer_core::tokenizer::tokenize;
use wayfarer_core::validation::import_preview::{ImportResult, RowData, RowStatus};
use wayfarer_core::validation::rules::ValidationSeverity;
use wayfarer_pipeline::{PipelineConfig, StaticResourceProbe, StaticResponse};

fn only_preview(result: &ImportResult) -> &wayfarer_core::validation::import_preview::RowPreview {
    let preview = result.preview.as_ref().expect("validateOnly runs carry a preview");
    assert_eq!(preview.len(), 1);
    &preview[0]
}

fn error_fields(result: &ImportResult) -> BTreeSet<String> {
    result.errors.iter().map(|i| i.field.clone()).collect()
}

// ---------------------------------------------------------------------------
// Test: a fully valid row is valid with no issues
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_template_row_is_valid() {
    let h = harness();
    let result = h
        .pipeline
        .run(csv_template().as_bytes(), &ImportOptions::default())
        .await;

    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert!(result.warnings.is_empty());
    assert_eq!(result.summary.total_rows, 1);
    assert_eq!(result.summary.successful_rows, 1);
    assert!(result.import_id.is_none());

    let preview = only_preview(&result);
    assert_eq!(preview.status, RowStatus::Valid);
    assert!(!preview.is_duplicate);
    assert!(matches!(&preview.data, RowData::Candidate(c) if c.name_en == "Chatuchak Weekend Market"));
    assert_eq!(h.probe.calls(), 1);
}

#[test]
fn test_template_round_trips_through_tokenizer() {
    let rows = tokenize(csv_template().as_bytes()).unwrap();
    assert_eq!(rows.len(), 1);
    let values: Vec<&str> = rows[0].fields.values().map(String::as_str).collect();
    assert_eq!(values, TEMPLATE_ROW);
    let columns: Vec<&str> = rows[0].fields.keys().map(String::as_str).collect();
    assert_eq!(columns, REQUIRED_COLUMNS);
}

// ---------------------------------------------------------------------------
// Test: one violated constraint yields exactly one error on that field
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_violation_reports_single_error() {
    let cases = [
        ("name_en", ""),
        ("budget_band", "extreme"),
        ("lat", "north"),
        ("mood_tags", "chill,haunted"),
        ("image_url", "not a url"),
        ("instagram_score", "11"),
        ("opening_hours", "not json"),
        ("opening_hours", r#"{"funday":"09:00-18:00"}"#),
        ("transport_access", "boat"),
        ("is_active", "maybe"),
    ];

    let h = harness();
    for (column, value) in cases {
        let data = csv_file(&[with_field(template_values(), column, value)]);
        let result = h.pipeline.run(&data, &ImportOptions::default()).await;

        assert_eq!(
            result.errors.len(),
            1,
            "{column}={value:?} should fail once, got {:?}",
            result.errors
        );
        assert_eq!(result.errors[0].field, column);
        assert_eq!(result.errors[0].row, 1);
        assert_eq!(only_preview(&result).status, RowStatus::Error);
        assert!(matches!(only_preview(&result).data, RowData::Raw(_)));
    }
}

// ---------------------------------------------------------------------------
// Scenario A: partial header, every missing column reported once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_columns_each_reported_once() {
    let h = harness();
    let data = "name_th,name_en,category\n\"จตุจักร\",\"Chatuchak\",\"market\"\n";
    let result = h.pipeline.run(data.as_bytes(), &ImportOptions::default()).await;

    let expected: BTreeSet<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !matches!(**c, "name_th" | "name_en" | "category"))
        .map(|c| c.to_string())
        .collect();
    assert_eq!(result.errors.len(), expected.len());
    assert_eq!(error_fields(&result), expected);
    assert!(result
        .errors
        .iter()
        .all(|i| i.message.ends_with("column is missing") && i.row == 1));
    assert_eq!(only_preview(&result).status, RowStatus::Error);
    assert_eq!(h.probe.calls(), 0);
}

// ---------------------------------------------------------------------------
// Scenario B: unknown budget band
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_budget_band_lists_allowed_values() {
    let h = harness();
    let data = csv_file(&[with_field(template_values(), "budget_band", "extreme")]);
    let result = h.pipeline.run(&data, &ImportOptions::default()).await;

    assert_eq!(result.errors.len(), 1);
    let issue = &result.errors[0];
    assert_eq!(issue.field, "budget_band");
    assert_eq!(issue.value.as_deref(), Some("extreme"));
    for band in ["low", "mid", "high"] {
        assert!(issue.message.contains(band), "message should list {band}: {}", issue.message);
    }
}

// ---------------------------------------------------------------------------
// Scenario C: coordinates outside Bangkok
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_coordinates_outside_bangkok() {
    let h = harness();
    let data = csv_file(&[destination("Pattaya Beach", "12.0", "99.0")]);
    let result = h.pipeline.run(&data, &ImportOptions::default()).await;

    assert_eq!(
        error_fields(&result),
        BTreeSet::from(["lat".to_string(), "lng".to_string()])
    );
    let preview = only_preview(&result);
    assert_eq!(preview.status, RowStatus::Error);
    assert!(!preview.is_duplicate);
}

// ---------------------------------------------------------------------------
// Summary counts partition the rows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_statuses_partition_rows() {
    let h = harness();
    let data = csv_file(&[
        destination("Lumphini Park", "13.7314", "100.5414"),
        with_field(destination("Wat Saket", "13.7540", "100.5066"), "instagram_score", "2"),
        with_field(destination("Khao San Road", "13.7589", "100.4974"), "is_active", "sometimes"),
        with_field(
            destination("Jim Thompson House", "13.7492", "100.5283"),
            "mood_tags",
            "cultural,artsy,photogenic,chill",
        ),
    ]);
    let result = h.pipeline.run(&data, &ImportOptions::default()).await;
    let s = &result.summary;

    assert_eq!(s.total_rows, 4);
    assert_eq!((s.successful_rows, s.warning_rows, s.error_rows), (1, 2, 1));
    assert_eq!(s.total_rows, s.successful_rows + s.warning_rows + s.error_rows);
    assert!(result.warnings.iter().all(|w| w.severity == ValidationSeverity::Warning));
    assert!(result.errors.iter().all(|e| e.severity == ValidationSeverity::Error));
}

// ---------------------------------------------------------------------------
// Row order survives concurrent validation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_row_order_restored_after_concurrent_probes() {
    // Earlier rows answer later, so completion order is reversed.
    let mut probe = StaticResourceProbe::accessible();
    let mut rows = Vec::new();
    for i in 0..6u64 {
        let url = format!("https://images.example.com/{i}.jpg");
        probe = probe.respond(
            url.clone(),
            StaticResponse::Delayed(
                Duration::from_millis(600 - i * 100),
                ProbeReport::accessible(Some(1024), Some("image/jpeg")),
            ),
        );
        let row = destination(&format!("Place {i}"), "13.75", &format!("100.5{i}"));
        let row = with_field(row, "image_url", &url);
        rows.push(with_field(row, "instagram_score", "1"));
    }
    let h = harness_with(probe, PipelineConfig::default());

    let options = ImportOptions {
        batch_size: 3,
        ..ImportOptions::default()
    };
    let result = h.pipeline.run(&csv_file(&rows), &options).await;

    let preview_rows: Vec<usize> = result.preview.as_ref().unwrap().iter().map(|p| p.row).collect();
    assert_eq!(preview_rows, vec![1, 2, 3, 4, 5, 6]);
    let warning_rows: Vec<usize> = result.warnings.iter().map(|w| w.row).collect();
    assert_eq!(warning_rows, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(h.probe.calls(), 6);
}

// ---------------------------------------------------------------------------
// Idempotence of validate-only runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_validate_only_is_idempotent() {
    let h = harness();
    let data = csv_file(&[
        destination("Lumphini Park", "13.7314", "100.5414"),
        with_field(destination("Wat Saket", "13.7540", "100.5066"), "budget_band", "free"),
        with_field(destination("Asiatique", "13.7045", "100.5030"), "instagram_score", "1"),
    ]);
    let options = ImportOptions::default();

    let mut first = h.pipeline.run(&data, &options).await;
    let mut second = h.pipeline.run(&data, &options).await;
    first.summary.processing_time_ms = 0;
    second.summary.processing_time_ms = 0;

    assert_eq!(first, second);
    assert_eq!(h.store.count().await, 0);
}

// ---------------------------------------------------------------------------
// File-level limits
// ---------------------------------------------------------------------------

fn small_config(max_rows: usize) -> PipelineConfig {
    PipelineConfig {
        limits: ImportLimits {
            max_rows,
            ..ImportLimits::default()
        },
        ..PipelineConfig::default()
    }
}

fn rows(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| destination(&format!("Place {i}"), "13.75", &format!("100.{:02}", 40 + i)))
        .collect()
}

#[tokio::test]
async fn test_exactly_max_rows_is_accepted() {
    let h = harness_with(StaticResourceProbe::accessible(), small_config(3));
    let result = h.pipeline.run(&csv_file(&rows(3)), &ImportOptions::default()).await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.summary.total_rows, 3);
}

#[tokio::test]
async fn test_one_row_over_max_fails_file() {
    let h = harness_with(StaticResourceProbe::accessible(), small_config(3));
    let result = h.pipeline.run(&csv_file(&rows(4)), &ImportOptions::default()).await;

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field, "file");
    assert_eq!(result.errors[0].row, 0);
    assert_eq!(result.summary.total_rows, 0);
    assert_eq!(result.preview.as_deref(), Some(&[][..]));
    assert_eq!(h.probe.calls(), 0);
}

#[tokio::test]
async fn test_oversized_file_fails_before_parsing() {
    let config = PipelineConfig {
        limits: ImportLimits {
            max_file_bytes: 64,
            ..ImportLimits::default()
        },
        ..PipelineConfig::default()
    };
    let h = harness_with(StaticResourceProbe::accessible(), config);
    let result = h.pipeline.run(csv_template().as_bytes(), &ImportOptions::default()).await;

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("maximum is 64 bytes"));
}

#[tokio::test]
async fn test_malformed_files_fail_at_file_level() {
    let h = harness();
    let cases: [&[u8]; 4] = [
        b"",
        b"name_en,lat\n\"Wat Pho,13.7\n",
        b"name_en,lat\nWat Pho,13.7,100.4\n",
        &[0x6e, 0x0a, 0xff],
    ];
    for data in cases {
        let result = h.pipeline.run(data, &ImportOptions::default()).await;
        assert_eq!(result.errors.len(), 1, "{:?}", String::from_utf8_lossy(data));
        assert_eq!(result.errors[0].field, "file");
        assert_eq!(result.summary.successful_rows, 0);
    }
}

#[tokio::test]
async fn test_header_only_file_has_no_rows() {
    let h = harness();
    let header = format!("{}\n", REQUIRED_COLUMNS.join(","));
    let result = h.pipeline.run(header.as_bytes(), &ImportOptions::default()).await;
    assert!(result.errors.is_empty());
    assert_eq!(result.summary.total_rows, 0);
}

// ---------------------------------------------------------------------------
// Image accessibility
// ---------------------------------------------------------------------------

async fn run_with_probe(response: StaticResponse) -> ImportResult {
    let h = harness_with(
        StaticResourceProbe::with_fallback(response),
        PipelineConfig {
            probe_timeout: Duration::from_millis(100),
            ..PipelineConfig::default()
        },
    );
    h.pipeline
        .run(csv_template().as_bytes(), &ImportOptions::default())
        .await
}

#[tokio::test]
async fn test_inaccessible_image_is_an_error() {
    let result = run_with_probe(StaticResponse::Report(ProbeReport::inaccessible())).await;
    assert_eq!(error_fields(&result), BTreeSet::from(["image_url".to_string()]));
}

#[tokio::test]
async fn test_probe_failure_degrades_to_warning() {
    let result = run_with_probe(StaticResponse::Fail("connection refused".into())).await;
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].field, "image_url");
    assert!(result.warnings[0].message.contains("connection refused"));
    assert_eq!(result.summary.warning_rows, 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_degrades_to_warning() {
    let result = run_with_probe(StaticResponse::Delayed(
        Duration::from_secs(30),
        ProbeReport::accessible(None, None),
    ))
    .await;
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_large_or_non_image_resource_warns() {
    let result = run_with_probe(StaticResponse::Report(ProbeReport::accessible(
        Some(6 * 1024 * 1024),
        Some("text/html"),
    )))
    .await;
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 2);
    assert_eq!(only_preview(&result).status, RowStatus::Warning);
}

// ---------------------------------------------------------------------------
// Options handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_out_of_range_batch_size_is_clamped() {
    let h = harness();
    let data = csv_file(&rows(3));
    for batch_size in [0, 10_000] {
        let options = ImportOptions {
            batch_size,
            ..ImportOptions::default()
        };
        let result = h.pipeline.run(&data, &options).await;
        assert!(result.errors.is_empty());
        assert_eq!(result.summary.total_rows, 3);
        assert!(result.warnings.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Issue export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_issues_csv_lists_errors_then_warnings() {
    let h = harness();
    let data = csv_file(&[
        with_field(destination("Wat Saket", "13.7540", "100.5066"), "instagram_score", "2"),
        with_field(destination("Khao San Road", "13.7589", "100.4974"), "budget_band", "free"),
    ]);
    let result = h.pipeline.run(&data, &ImportOptions::default()).await;
    let csv = result.issues_csv();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "row,field,severity,message,value");
    assert!(lines[1].starts_with("2,budget_band,error,"));
    assert!(lines[2].starts_with("1,instagram_score,warning,"));
    assert_eq!(lines.len(), 3);
}
