//! Caller-supplied import options and hard import limits.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 500;

/// How a run should treat the uploaded file.
///
/// Field names accept both `camelCase` (wire format) and `snake_case`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Validate and preview only; never write.
    #[serde(alias = "validate_only")]
    pub validate_only: bool,
    /// Replace stored destinations that a row duplicates.
    pub overwrite: bool,
    /// Leave duplicate rows out of the commit (ignored when `overwrite`).
    #[serde(alias = "skip_duplicates")]
    pub skip_duplicates: bool,
    /// Upper bound on rows validated concurrently.
    #[serde(alias = "batch_size")]
    #[validate(range(min = 1, max = 500))]
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            validate_only: true,
            overwrite: false,
            skip_duplicates: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportOptions {
    /// Options for a committing run with default duplicate handling.
    pub fn commit() -> Self {
        Self {
            validate_only: false,
            ..Self::default()
        }
    }

    /// Clamp out-of-range values into range.
    ///
    /// Returns the usable options plus a description of what was adjusted,
    /// so the caller can surface it as a warning instead of failing.
    pub fn normalized(&self) -> (Self, Option<String>) {
        match self.validate() {
            Ok(()) => (self.clone(), None),
            Err(_) => {
                let clamped = self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
                let note = format!(
                    "batchSize {} is outside {MIN_BATCH_SIZE}..={MAX_BATCH_SIZE}; using {clamped}",
                    self.batch_size
                );
                (
                    Self {
                        batch_size: clamped,
                        ..self.clone()
                    },
                    Some(note),
                )
            }
        }
    }
}

/// Hard and advisory limits applied to every import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLimits {
    /// Whole-file rejection above this many bytes.
    pub max_file_bytes: usize,
    /// Whole-file rejection above this many data rows.
    pub max_rows: usize,
    pub max_name_len: usize,
    pub max_description_len: usize,
    pub max_category_len: usize,
    pub max_district_len: usize,
    /// Hard cap on mood tags per row.
    pub max_mood_tags: usize,
    /// Soft cap; more tags than this earns a warning.
    pub recommended_mood_tags: usize,
    /// Scores strictly below this earn a curator-review warning.
    pub low_popularity_threshold: i64,
    /// Images larger than this earn a warning.
    pub max_image_bytes: u64,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_rows: 1000,
            max_name_len: 200,
            max_description_len: 2000,
            max_category_len: 50,
            max_district_len: 100,
            max_mood_tags: 5,
            recommended_mood_tags: 3,
            low_popularity_threshold: 3,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}
