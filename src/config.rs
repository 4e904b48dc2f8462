use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::host::FormSchemaProvider;
use crate::types::is_numeric_key;

/// Decides which snapshot keys are administrative metadata rather than field
/// values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKeyRule {
    /// Every key that is neither a numeric field id nor a field of the form.
    #[default]
    NonField,
    /// Exactly the listed keys are metadata.
    Listed(Vec<String>),
    /// Every key that is not a numeric field id is metadata.
    NonNumeric,
}

impl MetaKeyRule {
    pub fn is_meta_key(&self, key: &str, form: &dyn FormSchemaProvider) -> bool {
        match self {
            Self::NonField => !is_numeric_key(key) && form.field(key).is_none(),
            Self::Listed(keys) => keys.iter().any(|k| k == key),
            Self::NonNumeric => !is_numeric_key(key),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionsConfig {
    /// Keep the record's current administrative metadata when restoring.
    pub preserve_host_metadata_on_restore: bool,
    /// Remove a revision once it has been restored.
    pub delete_revision_after_restore: bool,
    /// Blob key the revision history is stored under.
    pub storage_key: String,
    pub empty_placeholder: String,
    /// Site offset used for local timestamps. `None` uses the process' zone.
    pub utc_offset_seconds: Option<i32>,
    pub restore_token_ttl_secs: u64,
    pub meta_keys: MetaKeyRule,
}

impl Default for RevisionsConfig {
    fn default() -> Self {
        Self {
            preserve_host_metadata_on_restore: true,
            delete_revision_after_restore: false,
            storage_key: "entry_revisions".to_string(),
            empty_placeholder: "[ empty ]".to_string(),
            utc_offset_seconds: None,
            restore_token_ttl_secs: 86_400,
            meta_keys: MetaKeyRule::default(),
        }
    }
}

impl RevisionsConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }
}
