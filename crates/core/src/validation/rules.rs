//! Validation issue and severity types.

use serde::{Deserialize, Serialize};

/// Field name used for file-level issues.
pub const FILE_FIELD: &str = "file";

/// Whether an issue blocks the commit or is informational.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A single problem found in the file or in one row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    /// 1-based row number; `0` for file-level issues.
    pub row: usize,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub severity: ValidationSeverity,
}

impl ValidationIssue {
    pub fn error(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
            value: None,
            severity: ValidationSeverity::Error,
        }
    }

    pub fn warning(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            ..Self::error(row, field, message)
        }
    }

    /// A fatal issue that applies to the whole file.
    pub fn file(message: impl Into<String>) -> Self {
        Self::error(0, FILE_FIELD, message)
    }

    /// Attach the offending raw value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}
