//! CSV codec plus byte decoding for file and HTTP input.
//!
//! Grammar:
//! - `\n` and `\r\n` end a line; a newline inside a quoted field does not
//! - the first line holds the headers; blank lines after it are skipped
//! - an unquoted field runs to the next unquoted delimiter and is trimmed of
//!   spaces and tabs
//! - a field whose first non-blank character is `"` is quoted; its quoted
//!   section is taken verbatim, with `""` read as a literal `"`, and text
//!   after the closing quote is kept with trailing padding dropped
//! - a `"` anywhere else in a field is a literal character
//! - an unterminated quote is closed by the end of its line
//!
//! Serialization quotes a field if and only if it contains the delimiter,
//! `"`, `\n` or `\r`, so every cell value survives a round trip.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Table;

/// Delimiter used when the caller does not pick one.
pub const DEFAULT_DELIMITER: char = ',';

// =============================================================================
// Parse
// =============================================================================

/// Parse CSV text into a [`Table`].
///
/// Blank or empty input yields an empty table.
///
/// # Example
/// ```
/// use pipeline_engine::parser::parse;
///
/// let table = parse("name,age\nAlice,30\n", ',');
/// assert_eq!(table.headers, vec!["name", "age"]);
/// assert_eq!(table.rows, vec![vec!["Alice", "30"]]);
/// ```
pub fn parse(text: &str, delimiter: char) -> Table {
    let lines = split_lines(text, delimiter);
    if lines.iter().all(|line| is_blank(line)) {
        return Table::default();
    }

    let mut lines = lines.into_iter();
    let headers = lines
        .next()
        .map(|line| parse_line(&line, delimiter))
        .unwrap_or_default();

    let rows = lines
        .filter(|line| !is_blank(line))
        .map(|line| parse_line(&line, delimiter))
        .collect();

    Table { headers, rows }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

/// Split text into logical lines, keeping quoted newlines inside their line.
///
/// A `"` opens a quoted section only at the start of a field, after optional
/// padding. Anywhere else it is a literal character.
fn split_lines(text: &str, delimiter: char) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            current.push(c);
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        match c {
            '\n' => {
                lines.push(std::mem::take(&mut current));
                at_field_start = true;
            }
            '\r' => {}
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
                current.push(c);
            }
            c if c == delimiter => {
                at_field_start = true;
                current.push(c);
            }
            ' ' | '\t' => current.push(c),
            _ => {
                at_field_start = false;
                current.push(c);
            }
        }
    }

    if in_quotes {
        // The quote never closed: fall back to plain line breaks for the tail.
        for piece in current.split('\n') {
            let piece = piece.strip_suffix('\r').unwrap_or(piece);
            lines.push(piece.to_string());
        }
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
    } else if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Accumulates one field while scanning a line.
#[derive(Default)]
struct FieldBuilder {
    text: String,
    quoted: bool,
    /// Length of `text` when the quoted section closed.
    quoted_end: usize,
}

impl FieldBuilder {
    /// A quote opens a quoted section only before any other content.
    fn can_open_quote(&self) -> bool {
        !self.quoted && is_blank(&self.text)
    }

    fn open_quote(&mut self) {
        self.text.clear();
        self.quoted = true;
    }

    fn close_quote(&mut self) {
        self.quoted_end = self.text.len();
    }

    fn finish(&mut self) -> String {
        let mut field = std::mem::take(self);
        if field.quoted {
            // Quoted content is verbatim; only trailing padding after it is dropped.
            let tail = field.text[field.quoted_end..].trim_end_matches([' ', '\t']).len();
            field.text.truncate(field.quoted_end + tail);
            field.text
        } else {
            field.text.trim_matches([' ', '\t']).to_string()
        }
    }
}

fn parse_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = FieldBuilder::default();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.text.push('"');
                } else {
                    in_quotes = false;
                    field.close_quote();
                }
            } else {
                field.text.push(c);
            }
        } else if c == '"' && field.can_open_quote() {
            field.open_quote();
            in_quotes = true;
        } else if c == delimiter {
            fields.push(field.finish());
        } else {
            field.text.push(c);
        }
    }

    if in_quotes {
        field.close_quote();
    }
    fields.push(field.finish());
    fields
}

// =============================================================================
// Serialize
// =============================================================================

/// Serialize a [`Table`] to CSV text. Every line, the last included, ends with `\n`.
pub fn serialize(table: &Table, delimiter: char) -> String {
    let mut out = String::new();
    write_line(&mut out, &table.headers, delimiter);
    for row in &table.rows {
        write_line(&mut out, row, delimiter);
    }
    out
}

fn write_line(out: &mut String, fields: &[String], delimiter: char) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape_field(field, delimiter));
    }
    out.push('\n');
}

/// Whether a field must be quoted on output.
pub fn needs_quoting(field: &str, delimiter: char) -> bool {
    field.contains(delimiter) || field.contains(['"', '\n', '\r'])
}

fn escape_field(field: &str, delimiter: char) -> Cow<'_, str> {
    if needs_quoting(field, delimiter) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

// =============================================================================
// JSON view
// =============================================================================

/// Convert a table into JSON objects, one per row, keyed by header.
///
/// Missing trailing cells become empty strings.
pub fn table_to_json(table: &Table) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = table
                .headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let cell = row.get(i).cloned().unwrap_or_default();
                    (h.clone(), Value::String(cell))
                })
                .collect();
            Value::Object(obj)
        })
        .collect()
}

// =============================================================================
// Byte decoding
// =============================================================================

/// Text decoded from raw bytes, with the encoding that was used.
#[derive(Debug, Clone)]
pub struct DecodedInput {
    pub text: String,
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the given encoding label.
///
/// Invalid UTF-8 and unknown labels fall back to lossy UTF-8; other
/// encodings fail if the bytes do not decode cleanly.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let label = encoding.to_lowercase();
    if matches!(label.as_str(), "utf-8" | "utf8" | "ascii") {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(enc) => {
            let (text, _, had_errors) = enc.decode(bytes);
            if had_errors {
                return Err(CsvError::EncodingError(format!(
                    "invalid {} byte sequence",
                    enc.name()
                )));
            }
            Ok(text.into_owned())
        }
        None => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Detect the encoding of `bytes`, decode them and strip a UTF-8 BOM.
pub fn decode_bytes(bytes: &[u8]) -> CsvResult<DecodedInput> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let encoding = detect_encoding(bytes);
    let text = decode_content(bytes, &encoding)?;
    Ok(DecodedInput { text, encoding })
}

/// Read and decode a CSV file.
pub fn read_file(path: impl AsRef<Path>) -> CsvResult<DecodedInput> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_bytes(&bytes)
}
