use std::sync::Arc;

use anyhow::Result;

use crate::storage::{ArcBlobStore, KeyValueBlobStore};
use crate::types::{RecordId, Revision, RevisionId};

use super::codec;

/// The ordered revision history of each record, kept as one blob per record
/// under a single storage key. Every mutation rewrites the whole blob.
#[derive(Clone)]
pub struct RevisionStore {
    blobs: ArcBlobStore,
    key: String,
}

impl RevisionStore {
    pub fn new(blobs: Arc<dyn KeyValueBlobStore>, key: &str) -> Self {
        Self {
            blobs: ArcBlobStore::new(blobs),
            key: key.to_string(),
        }
    }

    /// History in append order.
    fn load(&self, record_id: RecordId) -> Result<Vec<Revision>> {
        match self.blobs.get(record_id, &self.key)? {
            Some(blob) => codec::decode(&blob),
            None => Ok(Vec::new()),
        }
    }

    pub fn append(&self, record_id: RecordId, revision: Revision) -> Result<()> {
        log::debug!(
            "REVISIONS APPEND: record={}, revision={}, changed={}",
            record_id,
            revision.id(),
            revision.meta.changed.len()
        );
        let mut pending = Some(revision);
        self.blobs.update(record_id, &self.key, &mut |current| {
            let mut history = match current {
                Some(blob) => codec::decode(&blob)?,
                None => Vec::new(),
            };
            history.extend(pending.take());
            Ok(Some(codec::encode(&history)?))
        })
    }

    /// Newest first by GMT timestamp; revisions sharing a timestamp keep the
    /// most recently appended first.
    pub fn list(&self, record_id: RecordId) -> Result<Vec<Revision>> {
        let mut history = self.load(record_id)?;
        history.reverse();
        // stable sort keeps the reversed append order among equal timestamps
        history.sort_by(|a, b| b.id().cmp(&a.id()));
        log::debug!("REVISIONS LIST: record={}, count={}", record_id, history.len());
        Ok(history)
    }

    pub fn get_by_revision_id(
        &self,
        record_id: RecordId,
        revision_id: RevisionId,
    ) -> Result<Option<Revision>> {
        Ok(self
            .list(record_id)?
            .into_iter()
            .find(|revision| revision.id() == revision_id))
    }

    /// Removes the first revision with `revision_id`. Returns false, without
    /// writing, if the history is empty or has no such revision.
    pub fn delete_by_revision_id(
        &self,
        record_id: RecordId,
        revision_id: RevisionId,
    ) -> Result<bool> {
        let mut deleted = false;
        self.blobs.update(record_id, &self.key, &mut |current| {
            let Some(blob) = current else {
                return Ok(None);
            };
            let mut history = codec::decode(&blob)?;
            let Some(position) = history.iter().position(|r| r.id() == revision_id) else {
                return Ok(None);
            };
            history.remove(position);
            deleted = true;
            Ok(Some(codec::encode(&history)?))
        })?;
        log::debug!(
            "REVISIONS DELETE: record={}, revision={}, deleted={}",
            record_id,
            revision_id,
            deleted
        );
        Ok(deleted)
    }

    /// The most recently appended revision.
    pub fn get_last(&self, record_id: RecordId) -> Result<Option<Revision>> {
        Ok(self.load(record_id)?.pop())
    }

    /// Deletes the whole history of a record.
    pub fn purge(&self, record_id: RecordId) -> Result<bool> {
        log::debug!("REVISIONS PURGE: record={}", record_id);
        self.blobs.delete(record_id, &self.key)
    }
}
