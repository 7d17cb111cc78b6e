//! Destination domain types, closed vocabularies, and the canonical import
//! template.
//!
//! [`DestinationCandidate`] is the typed form of a row that passed every
//! schema rule. [`DestinationWrite`] is the storage representation the
//! commit step hands to a persistence sink.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::duplicate_detection::identity_key;
use crate::tokenizer::write_record;
use crate::types::DbId;

// ── Columns ──────────────────────────────────────────────────────────

pub const COL_NAME_TH: &str = "name_th";
pub const COL_NAME_EN: &str = "name_en";
pub const COL_DESCRIPTION_TH: &str = "description_th";
pub const COL_DESCRIPTION_EN: &str = "description_en";
pub const COL_CATEGORY: &str = "category";
pub const COL_BUDGET_BAND: &str = "budget_band";
pub const COL_DISTRICT: &str = "district";
pub const COL_LAT: &str = "lat";
pub const COL_LNG: &str = "lng";
pub const COL_MOOD_TAGS: &str = "mood_tags";
pub const COL_IMAGE_URL: &str = "image_url";
pub const COL_INSTAGRAM_SCORE: &str = "instagram_score";
pub const COL_OPENING_HOURS: &str = "opening_hours";
pub const COL_TRANSPORT_ACCESS: &str = "transport_access";
pub const COL_IS_ACTIVE: &str = "is_active";

/// Every required column, in template order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    COL_NAME_TH,
    COL_NAME_EN,
    COL_DESCRIPTION_TH,
    COL_DESCRIPTION_EN,
    COL_CATEGORY,
    COL_BUDGET_BAND,
    COL_DISTRICT,
    COL_LAT,
    COL_LNG,
    COL_MOOD_TAGS,
    COL_IMAGE_URL,
    COL_INSTAGRAM_SCORE,
    COL_OPENING_HOURS,
    COL_TRANSPORT_ACCESS,
    COL_IS_ACTIVE,
];

// ── Vocabularies ─────────────────────────────────────────────────────

pub const BUDGET_BANDS: &[&str] = &["low", "mid", "high"];

pub const TRANSPORT_ACCESS: &[&str] = &["bts_mrt", "taxi", "walk", "mixed"];

pub const MOOD_TAGS: &[&str] = &[
    "chill",
    "adventurous",
    "romantic",
    "cultural",
    "foodie",
    "nightlife",
    "nature",
    "shopping",
    "artsy",
    "family",
    "spiritual",
    "photogenic",
];

/// Keys accepted in the opening-hours object.
pub const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

// ── Geography ────────────────────────────────────────────────────────

/// Bangkok bounding box (inclusive).
pub const BANGKOK_LAT_MIN: f64 = 13.5;
pub const BANGKOK_LAT_MAX: f64 = 14.2;
pub const BANGKOK_LNG_MIN: f64 = 100.3;
pub const BANGKOK_LNG_MAX: f64 = 100.9;

pub const INSTAGRAM_SCORE_MIN: i64 = 1;
pub const INSTAGRAM_SCORE_MAX: i64 = 10;

// ── Types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetBand {
    Low,
    Mid,
    High,
}

impl BudgetBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "mid" => Some(Self::Mid),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportAccess {
    BtsMrt,
    Taxi,
    Walk,
    Mixed,
}

impl TransportAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BtsMrt => "bts_mrt",
            Self::Taxi => "taxi",
            Self::Walk => "walk",
            Self::Mixed => "mixed",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "bts_mrt" => Some(Self::BtsMrt),
            "taxi" => Some(Self::Taxi),
            "walk" => Some(Self::Walk),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// A fully typed row. Only built once every schema rule passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationCandidate {
    pub name_th: String,
    pub name_en: String,
    pub description_th: String,
    pub description_en: String,
    pub category: String,
    pub budget_band: BudgetBand,
    pub district: String,
    pub lat: f64,
    pub lng: f64,
    pub mood_tags: Vec<String>,
    pub image_url: String,
    pub instagram_score: i64,
    /// Weekday to `HH:MM-HH:MM`.
    pub opening_hours: BTreeMap<String, String>,
    pub transport_access: TransportAccess,
    pub is_active: bool,
}

impl DestinationCandidate {
    /// Normalized identity used for duplicate detection and the store's
    /// uniqueness constraint.
    pub fn identity_key(&self) -> String {
        identity_key(&self.name_en, self.lat, self.lng)
    }
}

/// Storage representation of one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationRecord {
    pub identity_key: String,
    pub name_th: String,
    pub name_en: String,
    pub description_th: String,
    pub description_en: String,
    pub category: String,
    pub budget_band: String,
    pub district: String,
    pub lat: f64,
    pub lng: f64,
    pub mood_tags: Vec<String>,
    pub image_url: String,
    pub instagram_score: i16,
    pub opening_hours: serde_json::Value,
    pub transport_access: String,
    pub is_active: bool,
}

impl From<&DestinationCandidate> for DestinationRecord {
    fn from(c: &DestinationCandidate) -> Self {
        let opening_hours = c
            .opening_hours
            .iter()
            .map(|(day, range)| (day.clone(), serde_json::Value::String(range.clone())))
            .collect::<serde_json::Map<_, _>>();

        Self {
            identity_key: c.identity_key(),
            name_th: c.name_th.clone(),
            name_en: c.name_en.clone(),
            description_th: c.description_th.clone(),
            description_en: c.description_en.clone(),
            category: c.category.clone(),
            budget_band: c.budget_band.as_str().to_string(),
            district: c.district.clone(),
            lat: c.lat,
            lng: c.lng,
            mood_tags: c.mood_tags.clone(),
            image_url: c.image_url.clone(),
            // Bounded to 1..=10 by the schema registry.
            instagram_score: c.instagram_score as i16,
            opening_hours: serde_json::Value::Object(opening_hours),
            transport_access: c.transport_access.as_str().to_string(),
            is_active: c.is_active,
        }
    }
}

/// One write the persistence sink must apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestinationWrite {
    /// Insert a new destination.
    Create {
        row: usize,
        record: DestinationRecord,
    },
    /// Replace the stored destination with this id.
    Overwrite {
        row: usize,
        existing_id: DbId,
        record: DestinationRecord,
    },
}

impl DestinationWrite {
    pub fn row(&self) -> usize {
        match self {
            Self::Create { row, .. } | Self::Overwrite { row, .. } => *row,
        }
    }

    pub fn record(&self) -> &DestinationRecord {
        match self {
            Self::Create { record, .. } | Self::Overwrite { record, .. } => record,
        }
    }
}

// ── Template ─────────────────────────────────────────────────────────

/// Values of the single example row in [`csv_template`], in column order.
pub const TEMPLATE_ROW: &[&str] = &[
    "ตลาดนัดจตุจักร",
    "Chatuchak Weekend Market",
    "ตลาดนัดสุดสัปดาห์ที่ใหญ่ที่สุดในกรุงเทพฯ",
    "Bangkok's largest weekend market, with thousands of stalls.",
    "market",
    "low",
    "Chatuchak",
    "13.7999",
    "100.5502",
    "shopping,foodie",
    "https://images.example.com/chatuchak.jpg",
    "8",
    r#"{"saturday":"09:00-18:00","sunday":"09:00-18:00"}"#,
    "bts_mrt",
    "true",
];

/// The canonical import file: header plus one valid example row.
pub fn csv_template() -> String {
    format!(
        "{}\n{}\n",
        write_record(REQUIRED_COLUMNS),
        write_record(TEMPLATE_ROW)
    )
}
