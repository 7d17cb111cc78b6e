use std::str::FromStr;
use std::time::Duration;

use wayfarer_core::error::CoreError;
use wayfarer_core::options::ImportLimits;

/// Longest accepted status lifetime (one year).
pub const MAX_STATUS_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Pipeline configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// File, row, length, and advisory limits.
    pub limits: ImportLimits,
    /// Per-call accessibility probe timeout (default: 5 s).
    pub probe_timeout: Duration,
    /// How long import status records stay retrievable (default: 24 h).
    pub status_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            limits: ImportLimits::default(),
            probe_timeout: Duration::from_millis(5000),
            status_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default   |
    /// |---------------------------|-----------|
    /// | `IMPORT_MAX_FILE_BYTES`   | `5242880` |
    /// | `IMPORT_MAX_ROWS`         | `1000`    |
    /// | `IMPORT_MAX_IMAGE_BYTES`  | `5242880` |
    /// | `IMPORT_PROBE_TIMEOUT_MS` | `5000`    |
    /// | `IMPORT_STATUS_TTL_SECS`  | `86400`   |
    ///
    /// `IMPORT_STATUS_TTL_SECS` must be between 1 and [`MAX_STATUS_TTL_SECS`].
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let limits = ImportLimits {
            max_file_bytes: parse_var(&lookup, "IMPORT_MAX_FILE_BYTES", defaults.limits.max_file_bytes)?,
            max_rows: parse_var(&lookup, "IMPORT_MAX_ROWS", defaults.limits.max_rows)?,
            max_image_bytes: parse_var(&lookup, "IMPORT_MAX_IMAGE_BYTES", defaults.limits.max_image_bytes)?,
            ..defaults.limits
        };
        let probe_timeout_ms: u64 = parse_var(&lookup, "IMPORT_PROBE_TIMEOUT_MS", 5000)?;
        let status_ttl_secs: u64 = parse_var(&lookup, "IMPORT_STATUS_TTL_SECS", 24 * 60 * 60)?;

        if limits.max_rows == 0 {
            return Err(CoreError::Validation("IMPORT_MAX_ROWS must be at least 1".into()));
        }
        if !(1..=MAX_STATUS_TTL_SECS).contains(&status_ttl_secs) {
            return Err(CoreError::Validation(format!(
                "IMPORT_STATUS_TTL_SECS must be between 1 and {MAX_STATUS_TTL_SECS}"
            )));
        }

        Ok(Self {
            limits,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
            status_ttl: Duration::from_secs(status_ttl_secs),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Validation(format!("{key} must be a valid number: {e}"))),
    }
}
