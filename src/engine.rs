use std::{path::Path, sync::Arc};

use rayon::prelude::*;
use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::config::RevisionsConfig;
use crate::diff::{self, DiffResult};
use crate::error::{validate_ids, validate_record_id, Result, RevisionError};
use crate::history::RevisionStore;
use crate::host::{ActorDirectory, AuditNoteSink, CurrentActor, FormSchemaProvider, RecordStore};
use crate::recorder::{EntrySource, RevisionRecorder};
use crate::restore::{RestoreEngine, RestorePolicy};
use crate::schema::FieldSchema;
use crate::storage::{EncryptedBlobStore, InMemoryBlobStore, KeyValueBlobStore, SqliteBlobStore};
use crate::summary::{RevisionPreview, RevisionSummary};
use crate::token::RestoreTokens;
use crate::types::{RecordId, Revision, RevisionId, Snapshot};

/// Revision history for the entries of a host record system: records
/// revisions on update, lists and previews them, and restores them.
pub struct EntryRevisions {
    store: RevisionStore,
    recorder: RevisionRecorder,
    restorer: RestoreEngine,
    records: Arc<dyn RecordStore>,
    directory: Option<Arc<dyn ActorDirectory>>,
    clock: Arc<dyn Clock>,
    tokens: RestoreTokens,
    config: RevisionsConfig,
}

impl EntryRevisions {
    pub fn builder() -> EntryRevisionsBuilder {
        EntryRevisionsBuilder::default()
    }

    /// Call after the host committed an update to a record. `previous` is the
    /// record as it was before the update.
    pub fn on_entry_updated(
        &self,
        form: &dyn FormSchemaProvider,
        source: EntrySource,
        previous: &Snapshot,
    ) -> Result<bool> {
        self.recorder.record(form, source, previous)
    }

    /// All revisions of a record, newest first.
    pub fn revisions(&self, record_id: RecordId) -> Result<Vec<Revision>> {
        validate_record_id(record_id)?;
        Ok(self.store.list(record_id)?)
    }

    pub fn revision(&self, record_id: RecordId, revision_id: RevisionId) -> Result<Revision> {
        validate_ids(record_id, revision_id)?;
        self.store
            .get_by_revision_id(record_id, revision_id)?
            .ok_or(RevisionError::RevisionNotFound {
                record_id,
                revision_id,
            })
    }

    /// Summaries of the revisions that still differ from the current record,
    /// newest first.
    pub fn summaries(
        &self,
        record_id: RecordId,
        form: &dyn FormSchemaProvider,
    ) -> Result<Vec<RevisionSummary>> {
        let revisions = self.revisions(record_id)?;
        if revisions.is_empty() {
            return Ok(Vec::new());
        }
        let current = self.current(record_id)?;
        let now = self.clock.now().gmt;
        let directory = self.directory.as_deref();

        let summaries = revisions
            .par_iter()
            .map(|revision| -> Result<Option<RevisionSummary>> {
                let diff = diff::diff(&revision.snapshot, &current, form)?;
                if diff.is_empty() {
                    return Ok(None);
                }
                let actor_id = revision.meta.actor_id;
                let author = directory
                    .and_then(|d| d.name_of(actor_id))
                    .unwrap_or_else(|| format!("#{}", actor_id));
                Ok(Some(RevisionSummary::new(revision, author, now, &diff)))
            })
            .collect::<Result<Vec<_>>>()?;
        let summaries: Vec<RevisionSummary> = summaries.into_iter().flatten().collect();
        log::debug!(
            "REVISIONS SUMMARIES: record={}, listed={}, differing={}",
            record_id,
            revisions.len(),
            summaries.len()
        );
        Ok(summaries)
    }

    /// A revision with its diff against the current record.
    pub fn preview(
        &self,
        record_id: RecordId,
        revision_id: RevisionId,
        form: &dyn FormSchemaProvider,
    ) -> Result<RevisionPreview> {
        let revision = self.revision(record_id, revision_id)?;
        let current = self.current(record_id)?;
        let diff: DiffResult = diff::diff(&revision.snapshot, &current, form)?;
        Ok(RevisionPreview::new(revision, diff))
    }

    /// Issues the single-use token `restore_with_token` requires.
    pub fn restore_token(&self, record_id: RecordId, revision_id: RevisionId) -> Result<String> {
        validate_ids(record_id, revision_id)?;
        Ok(self.tokens.issue(record_id, revision_id)?)
    }

    /// Restores a revision after checking the token issued for it. An invalid
    /// token writes nothing. Keys the form does not define as fields are kept
    /// from the current record unless configured otherwise.
    pub fn restore_with_token(
        &self,
        form: &dyn FormSchemaProvider,
        record_id: RecordId,
        revision_id: RevisionId,
        token: &str,
    ) -> Result<()> {
        validate_ids(record_id, revision_id)?;
        if !self.tokens.verify(token, record_id, revision_id)? {
            return Err(RevisionError::InvalidToken);
        }
        self.restorer.restore(form, record_id, revision_id)
    }

    /// Restores a revision without token verification, for callers that
    /// authorize the request themselves.
    pub fn restore(
        &self,
        form: &dyn FormSchemaProvider,
        record_id: RecordId,
        revision_id: RevisionId,
    ) -> Result<()> {
        self.restorer.restore(form, record_id, revision_id)
    }

    pub fn delete_revision(&self, record_id: RecordId, revision_id: RevisionId) -> Result<bool> {
        validate_ids(record_id, revision_id)?;
        Ok(self.store.delete_by_revision_id(record_id, revision_id)?)
    }

    /// Deletes every revision of a record, e.g. when the record is deleted.
    pub fn purge(&self, record_id: RecordId) -> Result<bool> {
        validate_record_id(record_id)?;
        Ok(self.store.purge(record_id)?)
    }

    pub fn note_inline_edit(
        &self,
        record_id: RecordId,
        field: &FieldSchema,
        old_value: &Value,
        new_value: &Value,
    ) -> Result<()> {
        validate_record_id(record_id)?;
        self.recorder.note_inline_edit(record_id, field, old_value, new_value);
        Ok(())
    }

    pub fn note_workflow_update(
        &self,
        form: &dyn FormSchemaProvider,
        record_id: RecordId,
        original: &Snapshot,
        updated: &Snapshot,
    ) -> Result<bool> {
        validate_record_id(record_id)?;
        Ok(self.recorder.note_workflow_update(form, record_id, original, updated))
    }

    pub fn store(&self) -> &RevisionStore {
        &self.store
    }

    pub fn recorder(&self) -> &RevisionRecorder {
        &self.recorder
    }

    pub fn restorer(&self) -> &RestoreEngine {
        &self.restorer
    }

    pub fn config(&self) -> &RevisionsConfig {
        &self.config
    }

    fn current(&self, record_id: RecordId) -> Result<Snapshot> {
        self.records
            .get(record_id)?
            .ok_or(RevisionError::RecordNotFound(record_id))
    }
}

#[derive(Default)]
pub struct EntryRevisionsBuilder {
    storage: Option<Box<dyn KeyValueBlobStore>>,
    passphrase: Option<String>,
    records: Option<Arc<dyn RecordStore>>,
    notes: Option<Arc<dyn AuditNoteSink>>,
    actor: Option<Arc<dyn CurrentActor>>,
    directory: Option<Arc<dyn ActorDirectory>>,
    clock: Option<Arc<dyn Clock>>,
    config: RevisionsConfig,
}

impl EntryRevisionsBuilder {
    pub fn in_memory(mut self) -> Self {
        self.storage = Some(Box::new(InMemoryBlobStore::new()));
        self
    }

    pub fn sqlite<P: AsRef<Path>>(mut self, path: P) -> anyhow::Result<Self> {
        self.storage = Some(Box::new(SqliteBlobStore::open(path)?));
        Ok(self)
    }

    pub fn sqlite_memory(mut self) -> anyhow::Result<Self> {
        self.storage = Some(Box::new(SqliteBlobStore::open_memory()?));
        Ok(self)
    }

    pub fn storage(mut self, storage: Box<dyn KeyValueBlobStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn encrypted(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn notes(mut self, notes: Arc<dyn AuditNoteSink>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn actor(mut self, actor: Arc<dyn CurrentActor>) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Resolves revision authors in summaries. Without one, authors are
    /// shown as "#<id>".
    pub fn directory(mut self, directory: Arc<dyn ActorDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Defaults to the system clock with the configured site offset.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: RevisionsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<EntryRevisions> {
        let storage = self.storage.ok_or_else(|| missing("blob storage"))?;
        let records = self.records.ok_or_else(|| missing("record store"))?;
        let notes = self.notes.ok_or_else(|| missing("note sink"))?;
        let actor = self.actor.ok_or_else(|| missing("current actor"))?;
        let config = self.config;
        if config.storage_key.is_empty() {
            return Err(RevisionError::Validation("storage key must not be empty".to_string()));
        }

        let storage: Arc<dyn KeyValueBlobStore> = match self.passphrase {
            Some(passphrase) => Arc::new(EncryptedBlobStore::new(storage, passphrase)),
            None => Arc::from(storage),
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new(config.utc_offset_seconds)));

        let store = RevisionStore::new(storage, &config.storage_key);
        let recorder = RevisionRecorder::new(
            store.clone(),
            records.clone(),
            notes,
            actor,
            clock.clone(),
            &config.empty_placeholder,
        );
        let restorer = RestoreEngine::new(
            store.clone(),
            records.clone(),
            RestorePolicy {
                preserve_host_metadata: config.preserve_host_metadata_on_restore,
                delete_after_restore: config.delete_revision_after_restore,
                meta_keys: config.meta_keys.clone(),
            },
        );
        let tokens = RestoreTokens::new(clock.clone(), config.restore_token_ttl_secs);

        Ok(EntryRevisions {
            store,
            recorder,
            restorer,
            records,
            directory: self.directory,
            clock,
            tokens,
            config,
        })
    }
}

fn missing(what: &str) -> RevisionError {
    RevisionError::Validation(format!("no {} configured", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::host::{InMemoryRecordStore, MemoryNoteSink, StaticActor};
    use crate::schema::{FieldType, Form};
    use serde_json::json;

    fn snapshot(value: Value) -> Snapshot {
        value.as_object().cloned().unwrap_or_default()
    }

    fn form() -> Form {
        Form::new(
            1,
            vec![
                FieldSchema::new("1", FieldType::Plain, "Name"),
                FieldSchema::new("2", FieldType::Plain, "Email"),
            ],
        )
    }

    fn engine(records: &InMemoryRecordStore, clock: &ManualClock) -> Result<EntryRevisions> {
        EntryRevisions::builder()
            .in_memory()
            .records(Arc::new(records.clone()))
            .notes(Arc::new(MemoryNoteSink::new()))
            .actor(Arc::new(StaticActor::new(3, "Admin")))
            .directory(Arc::new(StaticActor::new(3, "Admin")))
            .clock(Arc::new(clock.clone()))
            .build()
    }

    #[test]
    fn build_requires_collaborators() {
        let result = EntryRevisions::builder().in_memory().build();
        assert!(matches!(result, Err(RevisionError::Validation(_))));

        let result = EntryRevisions::builder()
            .records(Arc::new(InMemoryRecordStore::new()))
            .notes(Arc::new(MemoryNoteSink::new()))
            .actor(Arc::new(StaticActor::new(1, "a")))
            .build();
        match result {
            Err(RevisionError::Validation(message)) => {
                assert_eq!(message, "no blob storage configured")
            }
            _ => panic!("expected a validation error"),
        }
    }

    #[test]
    fn summaries_skip_revisions_matching_current() -> Result<()> {
        let records = InMemoryRecordStore::new();
        let clock = ManualClock::new(1_700_000_000, 0);
        let engine = engine(&records, &clock)?;

        records.insert(5, snapshot(json!({"1": "b", "2": "x"})))?;
        let previous = snapshot(json!({"1": "a", "2": "x"}));
        engine.on_entry_updated(&form(), EntrySource::Id(5), &previous)?;
        clock.advance(120);
        // back to "a": the newest revision holds "b", the oldest now matches
        records.insert(5, snapshot(json!({"1": "a", "2": "x"})))?;
        let previous = snapshot(json!({"1": "b", "2": "x"}));
        engine.on_entry_updated(&form(), EntrySource::Id(5), &previous)?;
        clock.advance(7_200);

        assert_eq!(engine.revisions(5)?.len(), 2);
        let summaries = engine.summaries(5, &form())?;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].revision_id, 1_700_000_120);
        assert_eq!(summaries[0].author, "Admin");
        assert_eq!(summaries[0].time_ago, "2 hours");
        assert_eq!(summaries[0].fields, vec!["1".to_string()]);
        assert_eq!(summaries[0].date, "November 14, 2023 @ 22:15:20");
        Ok(())
    }

    #[test]
    fn unknown_author_falls_back_to_id() -> Result<()> {
        let records = InMemoryRecordStore::new();
        let engine = EntryRevisions::builder()
            .in_memory()
            .records(Arc::new(records.clone()))
            .notes(Arc::new(MemoryNoteSink::new()))
            .actor(Arc::new(StaticActor::new(9, "Ghost")))
            .clock(Arc::new(ManualClock::new(1_000, 0)))
            .build()?;
        records.insert(1, snapshot(json!({"1": "new"})))?;
        engine.on_entry_updated(&form(), EntrySource::Id(1), &snapshot(json!({"1": "old"})))?;
        let summaries = engine.summaries(1, &form())?;
        assert_eq!(summaries[0].author, "#9");
        Ok(())
    }

    #[test]
    fn preview_reports_identical_revisions() -> Result<()> {
        let records = InMemoryRecordStore::new();
        let clock = ManualClock::new(2_000, 0);
        let engine = engine(&records, &clock)?;
        records.insert(5, snapshot(json!({"1": "new", "2": "same"})))?;
        let previous = snapshot(json!({"1": "old", "2": "same"}));
        engine.on_entry_updated(&form(), EntrySource::Id(5), &previous)?;

        let preview = engine.preview(5, 2_000, &form())?;
        assert!(!preview.identical);
        assert_eq!(preview.diff.field_ids(), vec!["1"]);

        records.insert(5, snapshot(json!({"1": "old", "2": "same"})))?;
        assert!(engine.preview(5, 2_000, &form())?.identical);
        assert!(matches!(
            engine.preview(5, 2_001, &form()),
            Err(RevisionError::RevisionNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn token_guards_restore() -> Result<()> {
        let records = InMemoryRecordStore::new();
        let clock = ManualClock::new(5_000, 0);
        let engine = engine(&records, &clock)?;
        records.insert(5, snapshot(json!({"1": "new"})))?;
        engine.on_entry_updated(&form(), EntrySource::Id(5), &snapshot(json!({"1": "old"})))?;

        let token = engine.restore_token(5, 5_000)?;
        assert!(matches!(
            engine.restore_with_token(&form(), 5, 5_000, "forged"),
            Err(RevisionError::InvalidToken)
        ));
        assert_eq!(records.get(5)?, Some(snapshot(json!({"1": "new"}))));

        engine.restore_with_token(&form(), 5, 5_000, &token)?;
        assert_eq!(records.get(5)?, Some(snapshot(json!({"1": "old"}))));
        assert!(matches!(
            engine.restore_with_token(&form(), 5, 5_000, &token),
            Err(RevisionError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn ids_are_validated_before_store_access() -> Result<()> {
        let records = InMemoryRecordStore::new();
        let engine = engine(&records, &ManualClock::new(1, 0))?;
        assert!(matches!(engine.revisions(0), Err(RevisionError::Validation(_))));
        assert!(matches!(engine.delete_revision(1, 0), Err(RevisionError::Validation(_))));
        assert!(matches!(engine.restore_token(1, -5), Err(RevisionError::Validation(_))));
        assert!(matches!(engine.purge(0), Err(RevisionError::Validation(_))));
        Ok(())
    }
}
