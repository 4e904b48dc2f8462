use serde::{Deserialize, Serialize};

use crate::host::FormSchemaProvider;

/// Field types with type-specific normalization. Any other host type
/// deserializes as `Plain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    List,
    #[serde(rename = "multiselect")]
    MultiSelect,
    #[serde(rename = "fileupload")]
    FileUpload,
    #[default]
    #[serde(other)]
    Plain,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "text")]
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(rename = "multipleFiles", default)]
    pub multiple_files: bool,
}

impl FieldSchema {
    pub fn new(id: &str, field_type: FieldType, label: &str) -> Self {
        Self {
            id: id.to_string(),
            field_type,
            label: label.to_string(),
            choices: Vec::new(),
            multiple_files: false,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_multiple_files(mut self, multiple_files: bool) -> Self {
        self.multiple_files = multiple_files;
        self
    }

    /// Label shown in notes and diff titles, falling back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// A form definition supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: u64,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl Form {
    pub fn new(id: u64, fields: Vec<FieldSchema>) -> Self {
        Self { id, fields }
    }
}

impl FormSchemaProvider for Form {
    /// Exact id match first; sub-input ids such as "3.2" fall back to their
    /// parent field "3".
    fn field(&self, field_id: &str) -> Option<FieldSchema> {
        if let Some(field) = self.fields.iter().find(|f| f.id == field_id) {
            return Some(field.clone());
        }
        let (parent, _) = field_id.split_once('.')?;
        self.fields.iter().find(|f| f.id == parent).cloned()
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
