//! Delimited-text tokenizer for bulk destination files.
//!
//! Turns raw upload bytes into ordered [`RawRow`]s keyed by header name.
//! Quoting follows the usual CSV conventions: a double-quoted field may
//! contain the delimiter and literal newlines, and `""` inside a quoted
//! field unescapes to a single `"`. A leading byte-order mark is stripped
//! and blank lines are skipped without consuming a row number.
//!
//! The tokenizer does no type checking; every value stays a string until
//! the schema registry inspects it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// UTF-8 byte-order mark some spreadsheet exports prepend.
pub const BYTE_ORDER_MARK: char = '\u{feff}';

/// Field delimiter.
pub const DELIMITER: char = ',';

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One data line of the uploaded file, keyed by header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number, header excluded, blank lines not counted.
    #[serde(skip)]
    pub row: usize,
    /// Column name to raw value, in header order.
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
}

impl RawRow {
    /// Raw value of a column, `None` when the column is absent from the file.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// File-level tokenizer failure. Any of these aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("File is empty")]
    Empty,

    #[error("Line {line}: expected {expected} fields but found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("Line {line}: duplicate column '{column}' in header")]
    DuplicateColumn { line: usize, column: String },
}

/// A physical record before header mapping.
#[derive(Debug)]
struct Record {
    /// 1-based source line the record starts on.
    line: usize,
    fields: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

/// Tokenize raw file bytes into rows.
///
/// The first non-blank record is the header. Every data record must carry
/// exactly as many fields as the header; a mismatch fails the whole file
/// and names the 1-based source line.
pub fn tokenize(data: &[u8]) -> Result<Vec<RawRow>, TokenizeError> {
    let text = std::str::from_utf8(data).map_err(|e| TokenizeError::InvalidUtf8(e.to_string()))?;
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);

    let mut records = split_records(text)?.into_iter();
    let header = records.next().ok_or(TokenizeError::Empty)?;
    let columns = header_columns(&header)?;

    let mut rows = Vec::new();
    for record in records {
        if record.fields.len() != columns.len() {
            return Err(TokenizeError::FieldCount {
                line: record.line,
                expected: columns.len(),
                found: record.fields.len(),
            });
        }
        let fields = columns.iter().cloned().zip(record.fields).collect();
        rows.push(RawRow {
            row: rows.len() + 1,
            fields,
        });
    }

    Ok(rows)
}

/// Trim header names and reject repeated columns.
fn header_columns(header: &Record) -> Result<Vec<String>, TokenizeError> {
    let mut columns: Vec<String> = Vec::with_capacity(header.fields.len());
    for name in &header.fields {
        let name = name.trim().to_string();
        if columns.contains(&name) {
            return Err(TokenizeError::DuplicateColumn {
                line: header.line,
                column: name,
            });
        }
        columns.push(name);
    }
    Ok(columns)
}

/// Split text into records, honouring quotes across line breaks.
///
/// Blank records (no delimiter, no quotes, only whitespace) are dropped.
fn split_records(text: &str) -> Result<Vec<Record>, TokenizeError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut saw_quote = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    current.push('\n');
                }
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                saw_quote = true;
            }
            DELIMITER => fields.push(std::mem::take(&mut current)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                push_record(&mut records, start_line, &mut fields, &mut current, saw_quote);
                saw_quote = false;
                line += 1;
                start_line = line;
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(TokenizeError::UnterminatedQuote { line: start_line });
    }
    push_record(&mut records, start_line, &mut fields, &mut current, saw_quote);

    Ok(records)
}

fn push_record(
    records: &mut Vec<Record>,
    line: usize,
    fields: &mut Vec<String>,
    current: &mut String,
    saw_quote: bool,
) {
    let blank = fields.is_empty() && !saw_quote && current.trim().is_empty();
    if blank {
        current.clear();
        return;
    }
    fields.push(std::mem::take(current));
    records.push(Record {
        line,
        fields: std::mem::take(fields),
    });
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Escape a value for CSV: wrap in quotes if it contains a delimiter, a
/// quote or a line break.
pub fn csv_escape(value: &str) -> String {
    if value.contains(&[DELIMITER, '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join values into one escaped CSV line (no trailing newline).
pub fn write_record<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| csv_escape(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

// ===========================================================================
// Tests
// ===========================================================================
