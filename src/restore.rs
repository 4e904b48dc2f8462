use std::sync::Arc;

use crate::config::MetaKeyRule;
use crate::error::{validate_ids, Result, RevisionError};
use crate::history::RevisionStore;
use crate::host::{FormSchemaProvider, RecordStore, UpdateOptions};
use crate::types::{RecordId, RevisionId, Snapshot, REVISION_KEY};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestorePolicy {
    /// Take administrative keys from the current record, not the revision.
    pub preserve_host_metadata: bool,
    pub delete_after_restore: bool,
    pub meta_keys: MetaKeyRule,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            preserve_host_metadata: true,
            delete_after_restore: false,
            meta_keys: MetaKeyRule::default(),
        }
    }
}

pub struct RestoreEngine {
    store: RevisionStore,
    records: Arc<dyn RecordStore>,
    policy: RestorePolicy,
}

impl RestoreEngine {
    pub fn new(store: RevisionStore, records: Arc<dyn RecordStore>, policy: RestorePolicy) -> Self {
        Self {
            store,
            records,
            policy,
        }
    }

    /// Builds the snapshot a restore would commit: the revision's values with
    /// administrative keys overwritten from `current` (unless the policy says
    /// otherwise), and the embedded revision metadata removed.
    pub fn merge(
        &self,
        form: &dyn FormSchemaProvider,
        revision_snapshot: &Snapshot,
        current: &Snapshot,
    ) -> Snapshot {
        let mut merged = revision_snapshot.clone();
        if self.policy.preserve_host_metadata {
            for (key, value) in current {
                if self.policy.meta_keys.is_meta_key(key, form) {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged.remove(REVISION_KEY);
        merged
    }

    /// Restores the record's field values from a revision.
    ///
    /// Nothing is written when the revision or the record is missing. A
    /// failed commit leaves the revision history untouched.
    pub fn restore(
        &self,
        form: &dyn FormSchemaProvider,
        record_id: RecordId,
        revision_id: RevisionId,
    ) -> Result<()> {
        validate_ids(record_id, revision_id)?;

        let revision = self
            .store
            .get_by_revision_id(record_id, revision_id)?
            .ok_or(RevisionError::RevisionNotFound {
                record_id,
                revision_id,
            })?;
        let current = self
            .records
            .get(record_id)?
            .ok_or(RevisionError::RecordNotFound(record_id))?;

        let merged = self.merge(form, &revision.snapshot, &current);
        let options = UpdateOptions {
            suppress_secondary_effects: true,
        };
        if let Err(e) = self.records.update(record_id, &merged, options) {
            log::error!(
                "Restoring revision {} of record {} failed: {}",
                revision_id,
                record_id,
                e
            );
            return Err(RevisionError::HostUpdate(e.to_string()));
        }
        log::debug!("REVISIONS RESTORE: record={}, revision={}", record_id, revision_id);

        // the record is already restored, so cleanup failures are not errors
        if self.policy.delete_after_restore {
            if let Err(e) = self.store.delete_by_revision_id(record_id, revision_id) {
                log::warn!(
                    "Restored revision {} of record {} but could not delete it: {}",
                    revision_id,
                    record_id,
                    e
                );
            }
        }
        Ok(())
    }
}
