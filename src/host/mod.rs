//! Interfaces to the host record-management system. The revision engines
//! only ever reach the outside world through these traits.

use anyhow::Result;

use crate::schema::FieldSchema;
use crate::types::{RecordId, Snapshot};

pub mod memory;

pub use memory::{InMemoryRecordStore, MemoryNoteSink, StaticActor};

/// Options for [`RecordStore::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Skip update observers (pre-update filters, post-update actions) for
    /// this commit so that it does not trigger secondary revision recording.
    pub suppress_secondary_effects: bool,
}

pub trait RecordStore: Send + Sync {
    fn get(&self, record_id: RecordId) -> Result<Option<Snapshot>>;
    fn update(
        &self,
        record_id: RecordId,
        snapshot: &Snapshot,
        options: UpdateOptions,
    ) -> Result<()>;
}

pub trait FormSchemaProvider: Send + Sync {
    fn field(&self, field_id: &str) -> Option<FieldSchema>;

    fn is_empty(&self) -> bool;
}

/// Fire-and-forget sink for human-readable change notes.
pub trait AuditNoteSink: Send + Sync {
    fn add_note(
        &self,
        record_id: RecordId,
        actor_id: u64,
        actor_name: &str,
        text: &str,
    ) -> Result<()>;
}

/// The user performing the current operation.
pub trait CurrentActor: Send + Sync {
    fn id(&self) -> u64;
    fn display_name(&self) -> String;
}

/// Resolves display names of past revision authors.
pub trait ActorDirectory: Send + Sync {
    fn name_of(&self, actor_id: u64) -> Option<String>;
}
