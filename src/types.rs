use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Host identifier of a record.
pub type RecordId = u64;

/// Revision identity: the GMT unix timestamp (seconds) the revision was taken.
pub type RevisionId = i64;

/// Full field-value mapping of a record at one point in time. Field ids are
/// the map keys; insertion order is preserved.
pub type Snapshot = Map<String, Value>;

/// Field id -> value before the change.
pub type ChangeSet = Map<String, Value>;

/// Key under which revision metadata is embedded in a stored snapshot.
pub const REVISION_KEY: &str = "_revision";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevisionMeta {
    /// Local (site time zone) unix timestamp.
    pub created_at: i64,
    /// GMT unix timestamp, also the revision id.
    pub created_at_gmt: RevisionId,
    pub actor_id: u64,
    pub changed: ChangeSet,
}

/// One stored historical snapshot. Serializes as the snapshot itself with the
/// metadata embedded under [`REVISION_KEY`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    #[serde(rename = "_revision")]
    pub meta: RevisionMeta,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl Revision {
    pub fn id(&self) -> RevisionId {
        self.meta.created_at_gmt
    }
}

/// Renders a raw value the way the host prints it: strings verbatim, null as
/// empty, booleans as "1"/"", composites as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// True when `key` looks like a host field id ("7", "2.3").
pub fn is_numeric_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn revision_embeds_metadata_in_snapshot() -> anyhow::Result<()> {
        let mut snapshot = Snapshot::new();
        snapshot.insert("1".to_string(), json!("old"));
        snapshot.insert("status".to_string(), json!("active"));
        let revision = Revision {
            meta: RevisionMeta {
                created_at: 100,
                created_at_gmt: 90,
                actor_id: 3,
                changed: snapshot.clone(),
            },
            snapshot,
        };

        let value = serde_json::to_value(&revision)?;
        assert_eq!(value["1"], json!("old"));
        assert_eq!(value["_revision"]["created_at_gmt"], json!(90));

        let back: Revision = serde_json::from_value(value)?;
        assert_eq!(back, revision);
        assert!(!back.snapshot.contains_key(REVISION_KEY));
        Ok(())
    }

    #[test]
    fn text_rendering() {
        assert_eq!(value_to_text(&json!(null)), "");
        assert_eq!(value_to_text(&json!(12)), "12");
        assert_eq!(value_to_text(&json!(true)), "1");
        assert_eq!(value_to_text(&json!(["a"])), "[\"a\"]");
    }

    #[test]
    fn numeric_keys() {
        assert!(is_numeric_key("7"));
        assert!(is_numeric_key("2.3"));
        assert!(!is_numeric_key("status"));
        assert!(!is_numeric_key(""));
        assert!(!is_numeric_key("field1"));
    }
}
