//! Schema evaluator: a table-driven registry of per-field rules.
//!
//! Each column maps to an ordered list of [`FieldRule`]s. Fields are
//! evaluated independently, so a row with three bad fields yields three
//! errors. Within one field evaluation stops at the first failing rule,
//! which keeps the report to one error per field.
//!
//! Fields that pass are parsed into [`TypedFields`]; when every field
//! passes, the row becomes a [`DestinationCandidate`]. Nothing downstream
//! reads the raw strings again.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::rules::ValidationIssue;
use crate::destination::*;
use crate::options::ImportLimits;
use crate::tokenizer::RawRow;

/// Longest accepted resource URL.
pub const MAX_URL_LEN: usize = 2048;

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d-([01]\d|2[0-3]):[0-5]\d$").expect("static regex")
});

// ── Registry ─────────────────────────────────────────────────────────

/// One composable check applied to a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// Column present and non-blank.
    Required,
    /// At most this many characters.
    MaxLength(usize),
    /// Member of a closed set (case-insensitive).
    OneOf(&'static [&'static str]),
    /// Finite decimal inside `[min, max]`.
    DecimalRange { min: f64, max: f64 },
    /// Whole number inside `[min, max]`.
    IntegerRange { min: i64, max: i64 },
    Boolean,
    /// Absolute `http`/`https` URL with a host.
    Url,
    /// JSON object of weekday to `HH:MM-HH:MM`.
    TimeRanges,
    /// Comma-separated entries from a closed vocabulary, `1..=max` of them.
    TagList {
        vocabulary: &'static [&'static str],
        max: usize,
    },
}

/// The contract for one column.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field: &'static str,
    pub rules: Vec<FieldRule>,
}

impl FieldSchema {
    pub fn new(field: &'static str, rules: Vec<FieldRule>) -> Self {
        Self { field, rules }
    }
}

/// Column name to ordered rules.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: Vec<FieldSchema>,
}

impl SchemaRegistry {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    /// The destination import schema.
    pub fn destinations(limits: &ImportLimits) -> Self {
        use FieldRule::*;

        let text = |max: usize| vec![Required, MaxLength(max)];
        Self::new(vec![
            FieldSchema::new(COL_NAME_TH, text(limits.max_name_len)),
            FieldSchema::new(COL_NAME_EN, text(limits.max_name_len)),
            FieldSchema::new(COL_DESCRIPTION_TH, text(limits.max_description_len)),
            FieldSchema::new(COL_DESCRIPTION_EN, text(limits.max_description_len)),
            FieldSchema::new(COL_CATEGORY, text(limits.max_category_len)),
            FieldSchema::new(COL_BUDGET_BAND, vec![Required, OneOf(BUDGET_BANDS)]),
            FieldSchema::new(COL_DISTRICT, text(limits.max_district_len)),
            FieldSchema::new(
                COL_LAT,
                vec![
                    Required,
                    DecimalRange {
                        min: BANGKOK_LAT_MIN,
                        max: BANGKOK_LAT_MAX,
                    },
                ],
            ),
            FieldSchema::new(
                COL_LNG,
                vec![
                    Required,
                    DecimalRange {
                        min: BANGKOK_LNG_MIN,
                        max: BANGKOK_LNG_MAX,
                    },
                ],
            ),
            FieldSchema::new(
                COL_MOOD_TAGS,
                vec![
                    Required,
                    TagList {
                        vocabulary: MOOD_TAGS,
                        max: limits.max_mood_tags,
                    },
                ],
            ),
            FieldSchema::new(COL_IMAGE_URL, vec![Required, MaxLength(MAX_URL_LEN), Url]),
            FieldSchema::new(
                COL_INSTAGRAM_SCORE,
                vec![
                    Required,
                    IntegerRange {
                        min: INSTAGRAM_SCORE_MIN,
                        max: INSTAGRAM_SCORE_MAX,
                    },
                ],
            ),
            FieldSchema::new(COL_OPENING_HOURS, vec![Required, TimeRanges]),
            FieldSchema::new(COL_TRANSPORT_ACCESS, vec![Required, OneOf(TRANSPORT_ACCESS)]),
            FieldSchema::new(COL_IS_ACTIVE, vec![Required, Boolean]),
        ])
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Evaluate every field of a row.
    pub fn evaluate(&self, row: &RawRow) -> SchemaOutcome {
        let mut issues = Vec::new();
        let mut passed = HashSet::new();

        for schema in &self.fields {
            let raw = row.get(schema.field);
            let failure = schema
                .rules
                .iter()
                .find_map(|rule| evaluate_single_rule(rule, schema.field, raw));
            match failure {
                Some(message) => {
                    let mut issue = ValidationIssue::error(row.row, schema.field, message);
                    if let Some(v) = raw {
                        issue = issue.with_value(v);
                    }
                    issues.push(issue);
                }
                None => {
                    passed.insert(schema.field);
                }
            }
        }

        SchemaOutcome {
            issues,
            fields: TypedFields::from_row(row, &passed),
        }
    }
}

/// Result of evaluating one row.
#[derive(Debug, Clone)]
pub struct SchemaOutcome {
    pub issues: Vec<ValidationIssue>,
    /// Typed values of the fields that passed.
    pub fields: TypedFields,
}

impl SchemaOutcome {
    /// The typed row, present only when every field passed.
    pub fn candidate(&self) -> Option<DestinationCandidate> {
        if self.issues.is_empty() {
            self.fields.clone().into_candidate()
        } else {
            None
        }
    }
}

// ── Rule evaluation ──────────────────────────────────────────────────

/// Check one rule. Returns the failure message, `None` on pass.
///
/// Rules other than `Required` pass on a missing or blank value; presence
/// is `Required`'s job.
fn evaluate_single_rule(rule: &FieldRule, field: &str, raw: Option<&str>) -> Option<String> {
    let value = raw.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return match rule {
            FieldRule::Required if raw.is_none() => Some(format!("{field} column is missing")),
            FieldRule::Required => Some(format!("{field} is required")),
            _ => None,
        };
    }

    match rule {
        FieldRule::Required => None,
        FieldRule::MaxLength(max) => evaluate_max_length(field, value, *max),
        FieldRule::OneOf(allowed) => evaluate_one_of(field, value, allowed),
        FieldRule::DecimalRange { min, max } => evaluate_decimal_range(field, value, *min, *max),
        FieldRule::IntegerRange { min, max } => evaluate_integer_range(field, value, *min, *max),
        FieldRule::Boolean => parse_bool(value)
            .is_none()
            .then(|| format!("{field} must be true or false")),
        FieldRule::Url => evaluate_url(field, value),
        FieldRule::TimeRanges => parse_time_ranges(value).err().map(|e| format!("{field} {e}")),
        FieldRule::TagList { vocabulary, max } => evaluate_tag_list(field, value, vocabulary, *max),
    }
}

fn evaluate_max_length(field: &str, value: &str, max: usize) -> Option<String> {
    let len = value.chars().count();
    (len > max).then(|| format!("{field} must be at most {max} characters (got {len})"))
}

fn evaluate_one_of(field: &str, value: &str, allowed: &[&str]) -> Option<String> {
    let lowered = value.to_lowercase();
    (!allowed.contains(&lowered.as_str()))
        .then(|| format!("{field} must be one of: {}", allowed.join(", ")))
}

fn evaluate_decimal_range(field: &str, value: &str, min: f64, max: f64) -> Option<String> {
    match parse_decimal(value) {
        None => Some(format!("{field} must be a number")),
        Some(n) if !(min..=max).contains(&n) => {
            Some(format!("{field} must be between {min} and {max}"))
        }
        Some(_) => None,
    }
}

fn evaluate_integer_range(field: &str, value: &str, min: i64, max: i64) -> Option<String> {
    match value.parse::<i64>() {
        Err(_) => Some(format!("{field} must be a whole number")),
        Ok(n) if !(min..=max).contains(&n) => {
            Some(format!("{field} must be between {min} and {max}"))
        }
        Ok(_) => None,
    }
}

fn evaluate_url(field: &str, value: &str) -> Option<String> {
    let ok = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);
    (!ok).then(|| format!("{field} must be a valid http(s) URL"))
}

fn evaluate_tag_list(
    field: &str,
    value: &str,
    vocabulary: &[&str],
    max: usize,
) -> Option<String> {
    let tags = parse_tags(value);
    if tags.is_empty() {
        return Some(format!("{field} must contain at least 1 tag"));
    }
    if tags.len() > max {
        return Some(format!(
            "{field} must contain at most {max} tags (got {})",
            tags.len()
        ));
    }
    let unknown: Vec<&str> = tags
        .iter()
        .map(String::as_str)
        .filter(|t| !vocabulary.contains(t))
        .collect();
    if unknown.is_empty() {
        None
    } else {
        Some(format!(
            "{field} contains unknown tags: {}. Allowed: {}",
            unknown.join(", "),
            vocabulary.join(", ")
        ))
    }
}

// ── Parsers ──────────────────────────────────────────────────────────

fn parse_decimal(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Split a comma list into lowercase, trimmed, non-empty tags.
pub fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse an opening-hours JSON object.
///
/// The error text is phrased to follow the field name.
pub fn parse_time_ranges(value: &str) -> Result<BTreeMap<String, String>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(value).map_err(|e| format!("is not valid JSON: {e}"))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| "must be a JSON object of weekday to \"HH:MM-HH:MM\"".to_string())?;

    let mut hours = BTreeMap::new();
    for (day, range) in object {
        let day = day.to_lowercase();
        if !WEEKDAYS.contains(&day.as_str()) {
            return Err(format!("has unknown weekday '{day}'"));
        }
        match range.as_str() {
            Some(r) if TIME_RANGE.is_match(r.trim()) => {
                hours.insert(day, r.trim().to_string());
            }
            _ => return Err(format!("value for '{day}' must match \"HH:MM-HH:MM\"")),
        }
    }
    Ok(hours)
}

// ── Typed fields ─────────────────────────────────────────────────────

/// Typed values for the fields that passed schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedFields {
    pub name_th: Option<String>,
    pub name_en: Option<String>,
    pub description_th: Option<String>,
    pub description_en: Option<String>,
    pub category: Option<String>,
    pub budget_band: Option<BudgetBand>,
    pub district: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub mood_tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub instagram_score: Option<i64>,
    pub opening_hours: Option<BTreeMap<String, String>>,
    pub transport_access: Option<TransportAccess>,
    pub is_active: Option<bool>,
}

impl TypedFields {
    fn from_row(row: &RawRow, passed: &HashSet<&'static str>) -> Self {
        let get = |field: &'static str| {
            passed
                .contains(field)
                .then(|| row.get(field).map(str::trim))
                .flatten()
        };
        let text = |field| get(field).map(str::to_string);

        Self {
            name_th: text(COL_NAME_TH),
            name_en: text(COL_NAME_EN),
            description_th: text(COL_DESCRIPTION_TH),
            description_en: text(COL_DESCRIPTION_EN),
            category: text(COL_CATEGORY),
            budget_band: get(COL_BUDGET_BAND)
                .and_then(|v| BudgetBand::from_str_value(&v.to_lowercase())),
            district: text(COL_DISTRICT),
            lat: get(COL_LAT).and_then(parse_decimal),
            lng: get(COL_LNG).and_then(parse_decimal),
            mood_tags: get(COL_MOOD_TAGS).map(parse_tags),
            image_url: text(COL_IMAGE_URL),
            instagram_score: get(COL_INSTAGRAM_SCORE).and_then(|v| v.parse().ok()),
            opening_hours: get(COL_OPENING_HOURS).and_then(|v| parse_time_ranges(v).ok()),
            transport_access: get(COL_TRANSPORT_ACCESS)
                .and_then(|v| TransportAccess::from_str_value(&v.to_lowercase())),
            is_active: get(COL_IS_ACTIVE).and_then(parse_bool),
        }
    }

    /// Assemble a candidate; `None` if any field is missing.
    pub fn into_candidate(self) -> Option<DestinationCandidate> {
        Some(DestinationCandidate {
            name_th: self.name_th?,
            name_en: self.name_en?,
            description_th: self.description_th?,
            description_en: self.description_en?,
            category: self.category?,
            budget_band: self.budget_band?,
            district: self.district?,
            lat: self.lat?,
            lng: self.lng?,
            mood_tags: self.mood_tags?,
            image_url: self.image_url?,
            instagram_score: self.instagram_score?,
            opening_hours: self.opening_hours?,
            transport_access: self.transport_access?,
            is_active: self.is_active?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn template_row() -> RawRow {
        tokenize(csv_template().as_bytes())
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    fn with(field: &str, value: &str) -> RawRow {
        let mut row = template_row();
        row.fields.insert(field.to_string(), value.to_string());
        row
    }

    fn evaluate(row: &RawRow) -> SchemaOutcome {
        SchemaRegistry::destinations(&ImportLimits::default()).evaluate(row)
    }

    fn only_error_field(row: &RawRow) -> (String, String) {
        let outcome = evaluate(row);
        assert_eq!(outcome.issues.len(), 1, "issues: {:?}", outcome.issues);
        let issue = &outcome.issues[0];
        (issue.field.clone(), issue.message.clone())
    }

    #[test]
    fn template_row_is_valid() {
        let outcome = evaluate(&template_row());
        assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
        let candidate = outcome.candidate().unwrap();
        assert_eq!(candidate.name_en, "Chatuchak Weekend Market");
        assert_eq!(candidate.budget_band, BudgetBand::Low);
        assert_eq!(candidate.mood_tags, vec!["shopping", "foodie"]);
        assert_eq!(candidate.opening_hours["sunday"], "09:00-18:00");
        assert!(candidate.is_active);
    }

    #[test]
    fn blank_required_field() {
        let (field, message) = only_error_field(&with(COL_NAME_EN, "   "));
        assert_eq!(field, COL_NAME_EN);
        assert_eq!(message, "name_en is required");
    }

    #[test]
    fn missing_column_reports_once() {
        let mut row = template_row();
        row.fields.shift_remove(COL_DISTRICT);
        let (field, message) = only_error_field(&row);
        assert_eq!(field, COL_DISTRICT);
        assert!(message.contains("missing"));
    }

    #[test]
    fn max_length_counts_characters_not_bytes() {
        let limits = ImportLimits::default();
        let thai = "ก".repeat(limits.max_name_len);
        assert!(evaluate(&with(COL_NAME_TH, &thai)).issues.is_empty());

        let too_long = "ก".repeat(limits.max_name_len + 1);
        let (field, _) = only_error_field(&with(COL_NAME_TH, &too_long));
        assert_eq!(field, COL_NAME_TH);
    }

    #[test]
    fn budget_band_message_lists_allowed_values() {
        let (field, message) = only_error_field(&with(COL_BUDGET_BAND, "extreme"));
        assert_eq!(field, COL_BUDGET_BAND);
        assert!(message.contains("low, mid, high"), "{message}");
    }

    #[test]
    fn enum_values_are_case_insensitive() {
        let outcome = evaluate(&with(COL_TRANSPORT_ACCESS, "BTS_MRT"));
        assert!(outcome.issues.is_empty());
        assert_eq!(
            outcome.candidate().unwrap().transport_access,
            TransportAccess::BtsMrt
        );
    }

    #[test]
    fn coordinates_outside_bangkok_fail_both_fields() {
        let mut row = with(COL_LAT, "12.0");
        row.fields.insert(COL_LNG.into(), "99.0".into());
        let outcome = evaluate(&row);
        let fields: Vec<&str> = outcome.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec![COL_LAT, COL_LNG]);
        assert!(outcome.candidate().is_none());
        assert_eq!(outcome.fields.name_en.as_deref(), Some("Chatuchak Weekend Market"));
        assert!(outcome.fields.lat.is_none());
    }

    #[test]
    fn non_numeric_and_non_finite_coordinates() {
        assert!(only_error_field(&with(COL_LAT, "north")).1.contains("number"));
        assert!(only_error_field(&with(COL_LNG, "NaN")).1.contains("number"));
    }

    #[test]
    fn instagram_score_bounds_and_integrality() {
        assert!(only_error_field(&with(COL_INSTAGRAM_SCORE, "11")).1.contains("between 1 and 10"));
        assert!(only_error_field(&with(COL_INSTAGRAM_SCORE, "0")).1.contains("between"));
        assert!(only_error_field(&with(COL_INSTAGRAM_SCORE, "7.5")).1.contains("whole"));
        assert!(evaluate(&with(COL_INSTAGRAM_SCORE, "10")).issues.is_empty());
    }

    #[test]
    fn url_must_be_absolute_http() {
        assert_eq!(only_error_field(&with(COL_IMAGE_URL, "not a url")).0, COL_IMAGE_URL);
        assert_eq!(only_error_field(&with(COL_IMAGE_URL, "ftp://x.com/a.jpg")).0, COL_IMAGE_URL);
        assert!(evaluate(&with(COL_IMAGE_URL, "http://cdn.example.com/a.png"))
            .issues
            .is_empty());
    }

    #[test]
    fn opening_hours_shapes() {
        assert!(only_error_field(&with(COL_OPENING_HOURS, "{not json")).1.contains("JSON"));
        assert!(only_error_field(&with(COL_OPENING_HOURS, "[1,2]")).1.contains("object"));
        assert!(only_error_field(&with(COL_OPENING_HOURS, r#"{"funday":"09:00-10:00"}"#))
            .1
            .contains("funday"));
        assert!(only_error_field(&with(COL_OPENING_HOURS, r#"{"monday":"9-5"}"#))
            .1
            .contains("HH:MM-HH:MM"));
        assert!(only_error_field(&with(COL_OPENING_HOURS, r#"{"monday":"24:00-25:00"}"#))
            .1
            .contains("monday"));
        // Overnight ranges are accepted.
        assert!(evaluate(&with(COL_OPENING_HOURS, r#"{"Friday":"18:00-02:00"}"#))
            .issues
            .is_empty());
        assert!(evaluate(&with(COL_OPENING_HOURS, "{}")).issues.is_empty());
    }

    #[test]
    fn mood_tags_vocabulary_and_count() {
        assert!(only_error_field(&with(COL_MOOD_TAGS, "chill,spooky")).1.contains("spooky"));
        assert!(only_error_field(&with(COL_MOOD_TAGS, " , ,")).1.contains("at least 1"));
        let six = "chill,romantic,cultural,foodie,nature,artsy";
        assert!(only_error_field(&with(COL_MOOD_TAGS, six)).1.contains("at most 5"));
        let outcome = evaluate(&with(COL_MOOD_TAGS, " Chill , NATURE "));
        assert_eq!(outcome.candidate().unwrap().mood_tags, vec!["chill", "nature"]);
    }

    #[test]
    fn boolean_spellings() {
        for (raw, expected) in [("TRUE", true), ("0", false), ("yes", true), ("No", false)] {
            let outcome = evaluate(&with(COL_IS_ACTIVE, raw));
            assert_eq!(outcome.candidate().unwrap().is_active, expected, "{raw}");
        }
        assert_eq!(only_error_field(&with(COL_IS_ACTIVE, "maybe")).0, COL_IS_ACTIVE);
    }

    #[test]
    fn three_bad_fields_three_errors() {
        let mut row = with(COL_BUDGET_BAND, "cheap");
        row.fields.insert(COL_INSTAGRAM_SCORE.into(), "99".into());
        row.fields.insert(COL_IS_ACTIVE.into(), "perhaps".into());
        let outcome = evaluate(&row);
        assert_eq!(outcome.issues.len(), 3);
        assert!(outcome.issues.iter().all(|i| i.is_error() && i.row == 1));
        assert_eq!(outcome.issues[0].value.as_deref(), Some("cheap"));
    }

    #[test]
    fn custom_registry_is_additive() {
        let registry = SchemaRegistry::new(vec![FieldSchema::new(
            "code",
            vec![FieldRule::Required, FieldRule::MaxLength(3)],
        )]);
        let rows = tokenize(b"code\nABCD").unwrap();
        let outcome = registry.evaluate(&rows[0]);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].field, "code");
    }
}
