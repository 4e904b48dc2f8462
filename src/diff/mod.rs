//! Per-field text diffs between a revision and the current record.

mod line_diff;

pub use line_diff::{diff_lines, normalize_whitespace, split_rows, DiffLine, SplitRow};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RevisionError};
use crate::host::FormSchemaProvider;
use crate::normalize::normalize;
use crate::types::{Snapshot, REVISION_KEY};

pub const TITLE_LEFT: &str = "Entry Revision";
pub const TITLE_RIGHT: &str = "Current Entry";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDiff {
    pub field_id: String,
    pub label: String,
    /// "<label> (Field <id>)"
    pub title: String,
    pub title_left: String,
    pub title_right: String,
    pub lines: Vec<DiffLine>,
}

impl FieldDiff {
    pub fn split_rows(&self) -> Vec<SplitRow> {
        split_rows(&self.lines)
    }
}

/// Field diffs in the order the fields appear in the previous snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiffResult {
    fields: Vec<FieldDiff>,
}

impl DiffResult {
    pub fn get(&self, field_id: &str) -> Option<&FieldDiff> {
        self.fields.iter().find(|d| d.field_id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDiff> {
        self.fields.iter()
    }

    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.iter().map(|d| d.field_id.as_str()).collect()
    }
}

/// Diffs every field of `previous` that the form still defines against
/// `current`. Fields the form no longer knows, and the embedded revision
/// metadata, are skipped. Both sides are normalized for display first, so a
/// field only appears when its rendered text differs.
pub fn diff(
    previous: &Snapshot,
    current: &Snapshot,
    form: &dyn FormSchemaProvider,
) -> Result<DiffResult> {
    if form.is_empty() {
        return Err(RevisionError::Validation("form schema has no fields".to_string()));
    }
    let null = Value::Null;
    let mut fields = Vec::new();
    for (key, previous_value) in previous {
        if key == REVISION_KEY {
            continue;
        }
        let Some(field) = form.field(key) else {
            continue;
        };
        let current_value = current.get(key).unwrap_or(&null);
        let lines = diff_lines(
            &normalize(previous_value, &field),
            &normalize(current_value, &field),
        );
        if lines.is_empty() {
            continue;
        }
        let label = field.display_label().to_string();
        fields.push(FieldDiff {
            field_id: key.clone(),
            title: format!("{} (Field {})", label, key),
            label,
            title_left: TITLE_LEFT.to_string(),
            title_right: TITLE_RIGHT.to_string(),
            lines,
        });
    }
    log::debug!("DIFF: {} of {} fields differ", fields.len(), previous.len());
    Ok(DiffResult { fields })
}
