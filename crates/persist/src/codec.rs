//! Markdown codec - frontmatter + body record format
//!
//! Deterministic, pure (de)serialization between a record and its persisted
//! text form. No state, no I/O.
//!
//! ## Format
//!
//! ```text
//! ---
//! id: <string>
//! created: <integer-millis>
//! updated: <integer-millis>
//! <field>: <scalar-or-JSON-array>
//! ...
//! ---
//!
//! <content-column-value-or-empty>
//! ```
//!
//! Frontmatter fields follow schema declaration order after
//! `id`/`created`/`updated`, skipping the designated content column (its
//! value becomes the body). Text without a leading `---` is body-only.

use folio_core::{format_number, Error, FieldValue, Fields, Record, Result, Schema};

/// Frontmatter delimiter line
const MARKER: &str = "---";

/// A decoded persisted record, not yet conformed to any schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRecord {
    /// `id` frontmatter entry, if present
    pub id: Option<String>,
    /// `created` frontmatter entry, if present
    pub created: Option<i64>,
    /// `updated` frontmatter entry, if present
    pub updated: Option<i64>,
    /// Remaining frontmatter entries with parsed scalar values
    pub fields: Fields,
    /// Body text (the content column's value)
    pub body: String,
}

/// Encode a record to its persisted text form.
///
/// `content_column` names the field whose value becomes the body instead of
/// a frontmatter line.
pub fn encode(record: &Record, schema: &Schema, content_column: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(MARKER);
    out.push('\n');
    out.push_str(&format!("id: {}\n", encode_string(&record.id)));
    out.push_str(&format!("created: {}\n", record.created));
    out.push_str(&format!("updated: {}\n", record.updated));
    for (name, _) in schema.fields() {
        if content_column == Some(name) {
            continue;
        }
        let value = record.field(name).cloned().unwrap_or(FieldValue::Null);
        out.push_str(&format!("{}: {}\n", name, encode_scalar(&value)));
    }
    out.push_str(MARKER);
    out.push_str("\n\n");
    if let Some(content) = content_column {
        if let Some(FieldValue::String(body)) = record.field(content) {
            out.push_str(body);
        }
    }
    out
}

/// Decode persisted text.
///
/// # Errors
///
/// `Decode` for an unterminated frontmatter block or a non-`key: value`
/// frontmatter line. Text with no leading `---` at all is valid body-only
/// input, not an error.
pub fn decode(text: &str) -> Result<DecodedRecord> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.first().map(|l| l.trim_end_matches('\r')) != Some(MARKER) {
        // No header at all: the whole text is body
        return Ok(DecodedRecord {
            body: text.to_string(),
            ..DecodedRecord::default()
        });
    }

    let close = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| l.trim_end_matches('\r') == MARKER)
        .map(|(at, _)| at)
        .ok_or_else(|| Error::Decode("unterminated frontmatter block".to_string()))?;

    let mut decoded = DecodedRecord::default();
    for line in &lines[1..close] {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let (key, raw) = line
            .split_once(':')
            .ok_or_else(|| Error::Decode(format!("malformed frontmatter line: {:?}", line)))?;
        let key = key.trim();
        let value = parse_scalar(raw.trim());
        match key {
            "id" => decoded.id = scalar_to_string(&value),
            "created" => decoded.created = value.as_number().map(|n| n as i64),
            "updated" => decoded.updated = value.as_number().map(|n| n as i64),
            _ => {
                decoded.fields.insert(key.to_string(), value);
            }
        }
    }

    let mut body_lines = &lines[close + 1..];
    // One blank separator line after the closing marker belongs to the
    // format, not the body
    if body_lines.first().map(|l| l.trim_end_matches('\r')) == Some("") {
        body_lines = &body_lines[1..];
    }
    decoded.body = body_lines.join("\n");
    Ok(decoded)
}

/// Encode one frontmatter scalar
fn encode_scalar(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Number(n) => format_number(*n),
        FieldValue::String(s) => encode_string(s),
        FieldValue::StringArray(a) => serde_json::to_string(a).unwrap_or_else(|_| "[]".to_string()),
        FieldValue::NumberArray(a) => serde_json::to_string(a).unwrap_or_else(|_| "[]".to_string()),
        FieldValue::Vector(v) => serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()),
    }
}

/// Strings stay bare unless the parser would misread them
fn encode_string(s: &str) -> String {
    if needs_quoting(s) {
        serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s))
    } else {
        s.to_string()
    }
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() || s.trim() != s {
        return true;
    }
    if matches!(s, "true" | "false" | "null" | "~") {
        return true;
    }
    if s.starts_with('"') || s.starts_with('\'') || s.starts_with('[') {
        return true;
    }
    if s.contains(':') || s.contains('#') || s.contains('\n') {
        return true;
    }
    // Numeric-looking strings would decode as numbers
    is_integer_literal(s) || is_float_literal(s)
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float_literal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot && !seen_exp => seen_dot = true,
            'e' | 'E' if seen_digit && !seen_exp => {
                seen_exp = true;
                if matches!(chars.peek(), Some('+') | Some('-')) {
                    chars.next();
                }
            }
            _ => return false,
        }
    }
    seen_digit && (seen_dot || seen_exp)
}

/// Parse one frontmatter scalar, in the documented recognition order:
/// empty/`~`/`null`, booleans, integer, decimal, JSON array, quoted string,
/// raw string.
fn parse_scalar(s: &str) -> FieldValue {
    if s.is_empty() || s == "~" || s == "null" {
        return FieldValue::Null;
    }
    if s == "true" {
        return FieldValue::Bool(true);
    }
    if s == "false" {
        return FieldValue::Bool(false);
    }
    if is_integer_literal(s) || is_float_literal(s) {
        if let Ok(n) = s.parse::<f64>() {
            return FieldValue::Number(n);
        }
    }
    if s.starts_with('[') {
        if let Ok(numbers) = serde_json::from_str::<Vec<f64>>(s) {
            return FieldValue::NumberArray(numbers);
        }
        if let Ok(strings) = serde_json::from_str::<Vec<String>>(s) {
            return FieldValue::StringArray(strings);
        }
        return FieldValue::String(s.to_string());
    }
    if s.starts_with('"') {
        if let Ok(unquoted) = serde_json::from_str::<String>(s) {
            return FieldValue::String(unquoted);
        }
    }
    FieldValue::String(s.to_string())
}

fn scalar_to_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::String(s) => Some(s.clone()),
        // Numeric-looking bare ids come back as numbers
        FieldValue::Number(n) => Some(format_number(*n)),
        FieldValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
