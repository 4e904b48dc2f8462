use anyhow::Result;
use serde_json::Value;

use crate::types::{Revision, REVISION_KEY};

/// Encodes a revision history as a MessagePack array of snapshots, each with
/// its metadata embedded under the revision key.
pub fn encode(revisions: &[Revision]) -> Result<Vec<u8>> {
    let items = revisions
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<Value>, _>>()?;
    Ok(rmp_serde::to_vec_named(&items)?)
}

/// Decodes a revision history blob in append order. A blob holding a single
/// revision map instead of an array is read as a one-element history.
pub fn decode(blob: &[u8]) -> Result<Vec<Revision>> {
    let value = rmpv::decode::read_value(&mut &blob[..])?;
    let items = match value {
        rmpv::Value::Nil => Vec::new(),
        rmpv::Value::Array(items) => items,
        rmpv::Value::Map(ref entries) if is_single_revision(entries) => vec![value],
        other => {
            return Err(anyhow::anyhow!(
                "Unexpected revision history shape: {}",
                other
            ))
        }
    };
    items
        .into_iter()
        .map(|item| {
            let json: Value = rmpv::ext::from_value(item)?;
            Ok(serde_json::from_value::<Revision>(json)?)
        })
        .collect()
}

fn is_single_revision(entries: &[(rmpv::Value, rmpv::Value)]) -> bool {
    entries
        .iter()
        .any(|(key, _)| key.as_str() == Some(REVISION_KEY))
}
