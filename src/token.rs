use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use uuid::Uuid;

use crate::clock::Clock;
use crate::types::{RecordId, RevisionId};

#[derive(Clone, Copy, Debug)]
struct Issued {
    record_id: RecordId,
    revision_id: RevisionId,
    expires_at: i64,
}

/// Single-use tokens authorizing the restore of one revision of one record.
#[derive(Clone)]
pub struct RestoreTokens {
    issued: Arc<Mutex<HashMap<String, Issued>>>,
    clock: Arc<dyn Clock>,
    ttl_secs: i64,
}

impl RestoreTokens {
    pub fn new(clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        Self {
            issued: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Operation name the token is bound to.
    pub fn action(record_id: RecordId, revision_id: RevisionId) -> String {
        format!("restore-entry-{}-revision-{}", record_id, revision_id)
    }

    pub fn issue(&self, record_id: RecordId, revision_id: RevisionId) -> Result<String> {
        let now = self.clock.now().gmt;
        let token = Uuid::now_v7().simple().to_string();
        let mut issued = self
            .issued
            .lock()
            .map_err(|_| anyhow::anyhow!("Failed to acquire token lock"))?;
        issued.retain(|_, t| t.expires_at > now);
        issued.insert(
            token.clone(),
            Issued {
                record_id,
                revision_id,
                expires_at: now.saturating_add(self.ttl_secs),
            },
        );
        log::debug!(
            "TOKEN ISSUE: action='{}'",
            Self::action(record_id, revision_id)
        );
        Ok(token)
    }

    /// Consumes `token` and reports whether it was issued for exactly this
    /// record and revision and has not expired. A token is spent by any
    /// verification attempt, successful or not.
    pub fn verify(
        &self,
        token: &str,
        record_id: RecordId,
        revision_id: RevisionId,
    ) -> Result<bool> {
        let now = self.clock.now().gmt;
        let mut issued = self
            .issued
            .lock()
            .map_err(|_| anyhow::anyhow!("Failed to acquire token lock"))?;
        let valid = match issued.remove(token) {
            Some(t) => {
                t.record_id == record_id && t.revision_id == revision_id && t.expires_at > now
            }
            None => false,
        };
        if !valid {
            log::warn!(
                "Restore token rejected for action '{}'",
                Self::action(record_id, revision_id)
            );
        }
        Ok(valid)
    }
}
