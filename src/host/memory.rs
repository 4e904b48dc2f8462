use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;

use crate::types::{RecordId, Snapshot};

use super::{ActorDirectory, AuditNoteSink, CurrentActor, RecordStore, UpdateOptions};

/// Record store held in memory. Counts how many commits ran with update
/// observers active, and can be told to reject updates.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<RecordId, Snapshot>>>,
    observed_updates: Arc<RwLock<u64>>,
    reject_updates: Arc<RwLock<Option<String>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record_id: RecordId, snapshot: Snapshot) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        records.insert(record_id, snapshot);
        Ok(())
    }

    /// Number of updates that ran with observers enabled.
    pub fn observed_updates(&self) -> u64 {
        self.observed_updates.read().map(|n| *n).unwrap_or_default()
    }

    /// Makes every following update fail with `message`; `None` clears it.
    pub fn reject_updates(&self, message: Option<&str>) {
        if let Ok(mut reject) = self.reject_updates.write() {
            *reject = message.map(|m| m.to_string());
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, record_id: RecordId) -> Result<Option<Snapshot>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?;
        Ok(records.get(&record_id).cloned())
    }

    fn update(
        &self,
        record_id: RecordId,
        snapshot: &Snapshot,
        options: UpdateOptions,
    ) -> Result<()> {
        log::debug!(
            "RECORD UPDATE: record={}, fields={}, suppress={}",
            record_id,
            snapshot.len(),
            options.suppress_secondary_effects
        );
        if let Some(message) = self
            .reject_updates
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock"))?
            .clone()
        {
            return Err(anyhow::anyhow!(message));
        }
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        if !records.contains_key(&record_id) {
            return Err(anyhow::anyhow!("Record {} does not exist", record_id));
        }
        records.insert(record_id, snapshot.clone());
        if !options.suppress_secondary_effects {
            let mut observed = self
                .observed_updates
                .write()
                .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
            *observed += 1;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub record_id: RecordId,
    pub actor_id: u64,
    pub actor_name: String,
    pub text: String,
}

/// Collects notes in memory.
#[derive(Clone, Default)]
pub struct MemoryNoteSink {
    notes: Arc<RwLock<Vec<Note>>>,
    failing: bool,
}

impl MemoryNoteSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `add_note` call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.read().map(|n| n.clone()).unwrap_or_default()
    }
}

impl AuditNoteSink for MemoryNoteSink {
    fn add_note(
        &self,
        record_id: RecordId,
        actor_id: u64,
        actor_name: &str,
        text: &str,
    ) -> Result<()> {
        if self.failing {
            return Err(anyhow::anyhow!("note storage unavailable"));
        }
        let mut notes = self
            .notes
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock"))?;
        notes.push(Note {
            record_id,
            actor_id,
            actor_name: actor_name.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// A fixed acting user, plus a directory of known users.
#[derive(Clone, Debug, Default)]
pub struct StaticActor {
    id: u64,
    name: String,
    directory: HashMap<u64, String>,
}

impl StaticActor {
    pub fn new(id: u64, name: &str) -> Self {
        let mut directory = HashMap::new();
        directory.insert(id, name.to_string());
        Self {
            id,
            name: name.to_string(),
            directory,
        }
    }

    pub fn with_known(mut self, id: u64, name: &str) -> Self {
        self.directory.insert(id, name.to_string());
        self
    }
}

impl CurrentActor for StaticActor {
    fn id(&self) -> u64 {
        self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl ActorDirectory for StaticActor {
    fn name_of(&self, actor_id: u64) -> Option<String> {
        self.directory.get(&actor_id).cloned()
    }
}
