//! Field-level change detection between two snapshots of a record.

use serde_json::Value;

use crate::types::{ChangeSet, Snapshot};

/// Returns the fields of `old` whose value is not loosely equal to the same
/// field in `new`, mapped to their old value.
///
/// Only keys present in `old` are considered, so a field that goes from
/// absent to populated is not reported. A key missing from `new` compares
/// as the empty string, matching how the host reads absent fields.
pub fn detect(old: &Snapshot, new: &Snapshot) -> ChangeSet {
    let empty = Value::String(String::new());
    old.iter()
        .filter(|(key, old_value)| !loose_eq(new.get(key.as_str()).unwrap_or(&empty), old_value))
        .map(|(key, old_value)| (key.clone(), old_value.clone()))
        .collect()
}

/// Fields that differ under strict comparison, ignoring fields empty on both
/// sides. Used for notes raised by workflow updates.
pub fn detect_strict(old: &Snapshot, new: &Snapshot) -> ChangeSet {
    old.iter()
        .filter(|(key, old_value)| match new.get(key.as_str()) {
            Some(new_value) if new_value == *old_value => false,
            new_value => !(is_empty(new_value.unwrap_or(&Value::Null)) && is_empty(old_value)),
        })
        .map(|(key, old_value)| (key.clone(), old_value.clone()))
        .collect()
}

/// Loose equality between two field values, in the host's comparison
/// semantics: numeric strings equal the numbers they spell, null equals
/// empty, booleans compare by truthiness.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, Value::Number(n)) | (Value::Number(n), Value::Null) => {
            n.as_f64() == Some(0.0)
        }
        (Value::Null, Value::Array(items)) | (Value::Array(items), Value::Null) => items.is_empty(),
        (Value::Null, Value::Object(map)) | (Value::Object(map), Value::Null) => map.is_empty(),
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match parse_numeric(s) {
                Some(parsed) => n.as_f64() == Some(parsed),
                None => n.to_string() == *s,
            }
        }
        (Value::String(x), Value::String(y)) => match (parse_numeric(x), parse_numeric(y)) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).map(|b| loose_eq(a, b)).unwrap_or(false))
        }
        _ => false,
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok()?;
    // Rust accepts "inf" and "NaN"; the host does not treat them as numbers.
    parsed.is_finite().then_some(parsed)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn is_empty(value: &Value) -> bool {
    !truthy(value)
}
