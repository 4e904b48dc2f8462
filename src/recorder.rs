use std::sync::Arc;

use serde_json::Value;

use crate::changes;
use crate::clock::Clock;
use crate::error::{validate_record_id, Result, RevisionError};
use crate::history::RevisionStore;
use crate::host::{AuditNoteSink, CurrentActor, FormSchemaProvider, RecordStore};
use crate::normalize::{normalize, or_placeholder};
use crate::schema::FieldSchema;
use crate::types::{
    value_to_text, ChangeSet, RecordId, Revision, RevisionMeta, Snapshot, REVISION_KEY,
};

/// Author name used for notes raised by workflow updates.
pub const WORKFLOW_NOTE_AUTHOR: &str = "Workflow step";

/// Where the post-update state of a record comes from.
#[derive(Clone, Debug)]
pub enum EntrySource {
    /// Fetch the current snapshot from the record store.
    Id(RecordId),
    /// The caller already holds the current snapshot.
    Snapshot { record_id: RecordId, snapshot: Snapshot },
}

impl EntrySource {
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Id(record_id) => *record_id,
            Self::Snapshot { record_id, .. } => *record_id,
        }
    }
}

/// Turns record updates into stored revisions and change notes.
pub struct RevisionRecorder {
    store: RevisionStore,
    records: Arc<dyn RecordStore>,
    notes: Arc<dyn AuditNoteSink>,
    actor: Arc<dyn CurrentActor>,
    clock: Arc<dyn Clock>,
    empty_placeholder: String,
}

impl RevisionRecorder {
    pub fn new(
        store: RevisionStore,
        records: Arc<dyn RecordStore>,
        notes: Arc<dyn AuditNoteSink>,
        actor: Arc<dyn CurrentActor>,
        clock: Arc<dyn Clock>,
        empty_placeholder: &str,
    ) -> Self {
        Self {
            store,
            records,
            notes,
            actor,
            clock,
            empty_placeholder: empty_placeholder.to_string(),
        }
    }

    /// Stores `previous` as a revision of the record if any of its fields
    /// changed, and emits a change note. Returns false when nothing changed.
    ///
    /// The note is best effort: a failing note sink is logged and does not
    /// undo the stored revision.
    pub fn record(
        &self,
        form: &dyn FormSchemaProvider,
        source: EntrySource,
        previous: &Snapshot,
    ) -> Result<bool> {
        let record_id = source.record_id();
        validate_record_id(record_id)?;
        if form.is_empty() {
            return Err(RevisionError::Validation("form schema has no fields".to_string()));
        }

        let current = match source {
            EntrySource::Snapshot { snapshot, .. } => snapshot,
            EntrySource::Id(record_id) => self
                .records
                .get(record_id)?
                .ok_or(RevisionError::RecordNotFound(record_id))?,
        };

        let mut previous = previous.clone();
        previous.remove(REVISION_KEY);

        let changed = changes::detect(&previous, &current);
        if changed.is_empty() {
            log::debug!("REVISIONS RECORD: record={}, no changes", record_id);
            return Ok(false);
        }

        let now = self.clock.now();
        let actor_id = self.actor.id();
        let note = self.change_note(form, &changed, &current);
        let revision = Revision {
            meta: RevisionMeta {
                created_at: now.local,
                created_at_gmt: now.gmt,
                actor_id,
                changed,
            },
            snapshot: previous,
        };
        self.store.append(record_id, revision)?;

        self.emit_note(record_id, actor_id, &self.actor.display_name(), &note);
        Ok(true)
    }

    /// One "Field ... From ... To" block per changed field, values normalized
    /// for display.
    pub fn change_note(
        &self,
        form: &dyn FormSchemaProvider,
        changed: &ChangeSet,
        current: &Snapshot,
    ) -> String {
        let null = Value::Null;
        let mut note = String::new();
        for (key, old_value) in changed {
            let new_value = current.get(key).unwrap_or(&null);
            let field = form.field(key);
            let (from, to) = match &field {
                Some(field) => (normalize(old_value, field), normalize(new_value, field)),
                None => (value_to_text(old_value), value_to_text(new_value)),
            };
            let label = field.as_ref().map(FieldSchema::display_label).unwrap_or(key.as_str());
            note.push_str(&format_note_entry(
                label,
                &or_placeholder(from, &self.empty_placeholder),
                &or_placeholder(to, &self.empty_placeholder),
            ));
        }
        note
    }

    /// Note for a single field edited in place. No revision is stored.
    pub fn note_inline_edit(
        &self,
        record_id: RecordId,
        field: &FieldSchema,
        old_value: &Value,
        new_value: &Value,
    ) {
        let note = format_note_entry(
            field.display_label(),
            &value_to_text(old_value),
            &value_to_text(new_value),
        );
        self.emit_note(record_id, self.actor.id(), &self.actor.display_name(), &note);
    }

    /// Note for an update made by a workflow step. Uses strict comparison and
    /// ignores fields empty on both sides. Returns true if a note was emitted.
    pub fn note_workflow_update(
        &self,
        form: &dyn FormSchemaProvider,
        record_id: RecordId,
        original: &Snapshot,
        updated: &Snapshot,
    ) -> bool {
        let changed = changes::detect_strict(original, updated);
        if changed.is_empty() {
            return false;
        }
        let null = Value::Null;
        let mut note = String::new();
        for (key, old_value) in &changed {
            let label = form
                .field(key)
                .map(|f| f.display_label().to_string())
                .unwrap_or_else(|| key.clone());
            note.push_str(&format_note_entry(
                &label,
                &value_to_text(old_value),
                &value_to_text(updated.get(key).unwrap_or(&null)),
            ));
        }
        self.emit_note(record_id, 0, WORKFLOW_NOTE_AUTHOR, &note);
        true
    }

    fn emit_note(&self, record_id: RecordId, actor_id: u64, actor_name: &str, note: &str) {
        if let Err(e) = self.notes.add_note(record_id, actor_id, actor_name, note) {
            log::warn!("Failed to add change note to record {}: {}", record_id, e);
        }
    }
}

pub fn format_note_entry(label: &str, from: &str, to: &str) -> String {
    format!("Field {}\n  -- From: {}\n  -- To: {}\r\n\n", label, from, to)
}
