//! Type-aware conversion of raw field values into their display form.
//!
//! Every function here is pure. Malformed composite values fail closed: the
//! raw value is rendered as text rather than aborting the caller.

use serde_json::Value;

use crate::schema::{FieldSchema, FieldType};
use crate::types::value_to_text;

/// Normalizes `raw` for display according to the field's type.
pub fn normalize(raw: &Value, field: &FieldSchema) -> String {
    if is_blank(raw) {
        return String::new();
    }
    let normalized = match field.field_type {
        FieldType::List => normalize_list(raw),
        FieldType::MultiSelect => normalize_multiselect(raw, field),
        FieldType::FileUpload => normalize_fileupload(raw, field),
        FieldType::Plain => None,
    };
    normalized.unwrap_or_else(|| value_to_text(raw))
}

/// Replaces an empty display value with `placeholder`.
pub fn or_placeholder(display: String, placeholder: &str) -> String {
    if display.is_empty() {
        placeholder.to_string()
    } else {
        display
    }
}

fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Composite values arrive either already decoded or as JSON text.
fn decode(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Array(_) | Value::Object(_) => Some(raw.clone()),
        _ => None,
    }
}

/// `\r\nRow 1: a, b\r\nRow 2: c\r\n`
fn normalize_list(raw: &Value) -> Option<String> {
    let rows = match decode(raw)? {
        Value::Array(rows) => rows,
        _ => return None,
    };
    let mut out = String::from("\r\n");
    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<String> = match row {
            Value::Object(columns) => columns.values().map(value_to_text).collect(),
            Value::Array(cells) => cells.iter().map(value_to_text).collect(),
            other => vec![value_to_text(other)],
        };
        out.push_str(&format!("Row {}: {}\r\n", index + 1, cells.join(", ")));
    }
    Some(out)
}

/// Selected values become their choice labels; unknown values are dropped.
fn normalize_multiselect(raw: &Value, field: &FieldSchema) -> Option<String> {
    let selected = match decode(raw)? {
        Value::Array(selected) => selected,
        _ => return None,
    };
    let labels: Vec<Value> = selected
        .iter()
        .filter_map(|value| {
            let value = value_to_text(value);
            field
                .choices
                .iter()
                .find(|choice| choice.value == value)
                .map(|choice| Value::String(choice.label.clone()))
        })
        .collect();
    serde_json::to_string(&labels).ok()
}

fn normalize_fileupload(raw: &Value, field: &FieldSchema) -> Option<String> {
    if !field.multiple_files {
        return match raw {
            Value::String(url) => Some(basename(url).to_string()),
            _ => None,
        };
    }
    let urls = match decode(raw)? {
        Value::Array(urls) => urls,
        _ => return None,
    };
    let names: Vec<Value> = urls
        .iter()
        .map(|url| Value::String(basename(&value_to_text(url)).to_string()))
        .collect();
    serde_json::to_string(&names).ok()
}

/// Last path segment of a URL or path, without query or fragment.
pub fn basename(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = url[..end].trim_end_matches(|c: char| c == '/' || c == '\\');
    match path.rfind(|c: char| c == '/' || c == '\\') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}
