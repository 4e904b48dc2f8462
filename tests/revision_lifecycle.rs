use std::sync::Arc;

use entry_revisions::clock::ManualClock;
use entry_revisions::host::{InMemoryRecordStore, MemoryNoteSink, RecordStore, StaticActor};
use entry_revisions::recorder::WORKFLOW_NOTE_AUTHOR;
use entry_revisions::{
    Choice, EntryRevisions, EntrySource, FieldSchema, FieldType, Form, RevisionError,
    RevisionsConfig, Snapshot,
};
use serde_json::{json, Value};

struct Host {
    records: InMemoryRecordStore,
    notes: MemoryNoteSink,
    clock: ManualClock,
}

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn snapshot(value: Value) -> Snapshot {
    value.as_object().cloned().unwrap_or_default()
}

fn contact_form() -> Form {
    Form::new(
        3,
        vec![
            FieldSchema::new("1", FieldType::Plain, "Name"),
            FieldSchema::new("2", FieldType::MultiSelect, "Interests").with_choices(vec![
                Choice::new("v1", "Red"),
                Choice::new("v2", "Blue"),
                Choice::new("v3", "Green"),
            ]),
            FieldSchema::new("3", FieldType::List, "Guests"),
            FieldSchema::new("4", FieldType::FileUpload, "Resume"),
            FieldSchema::new("5", FieldType::Plain, "Address"),
            FieldSchema::new("field1", FieldType::Plain, "Nickname"),
        ],
    )
}

fn revisions_with(config: RevisionsConfig) -> anyhow::Result<(EntryRevisions, Host)> {
    init_logging();
    let host = Host {
        records: InMemoryRecordStore::new(),
        notes: MemoryNoteSink::new(),
        clock: ManualClock::new(1_700_000_000, -18_000),
    };
    let revisions = EntryRevisions::builder()
        .in_memory()
        .records(Arc::new(host.records.clone()))
        .notes(Arc::new(host.notes.clone()))
        .actor(Arc::new(StaticActor::new(2, "Editor")))
        .directory(Arc::new(StaticActor::new(2, "Editor").with_known(1, "Owner")))
        .clock(Arc::new(host.clock.clone()))
        .config(config)
        .build()?;
    Ok((revisions, host))
}

/// Applies `next` as the host would and reports the update.
fn update_entry(
    revisions: &EntryRevisions,
    host: &Host,
    record_id: u64,
    next: Value,
) -> anyhow::Result<bool> {
    let previous = host.records.get(record_id)?.unwrap_or_default();
    host.records.insert(record_id, snapshot(next))?;
    Ok(revisions.on_entry_updated(&contact_form(), EntrySource::Id(record_id), &previous)?)
}

#[test]
fn edit_list_preview_and_restore() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    let form = contact_form();

    host.records.insert(
        10,
        snapshot(json!({
            "id": 10, "status": "active", "1": "Ann", "2": "[\"v1\",\"v3\"]",
            "3": [["Bob", "Smith"]], "4": "https://example.com/uploads/cv-2023.pdf?ver=2", "5": ""
        })),
    )?;

    assert!(update_entry(
        &revisions,
        &host,
        10,
        json!({
            "id": 10, "status": "active", "1": "Ann", "2": "[\"v2\"]",
            "3": [["Bob", "Smith"], ["Cy", "Jones"]],
            "4": "https://example.com/uploads/cv-2024.pdf", "5": "Main St"
        })
    )?);

    let notes = host.notes.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].record_id, 10);
    assert_eq!(notes[0].actor_name, "Editor");
    assert!(notes[0]
        .text
        .contains("Field Interests\n  -- From: [\"Red\",\"Green\"]\n  -- To: [\"Blue\"]\r\n\n"));
    assert!(notes[0]
        .text
        .contains("Field Resume\n  -- From: cv-2023.pdf\n  -- To: cv-2024.pdf\r\n\n"));
    assert!(notes[0]
        .text
        .contains("Field Address\n  -- From: [ empty ]\n  -- To: Main St\r\n\n"));
    assert!(!notes[0].text.contains("Field Name"));

    let listed = revisions.revisions(10)?;
    assert_eq!(listed.len(), 1);
    let revision_id = listed[0].id();
    assert_eq!(revision_id, 1_700_000_000);
    assert_eq!(listed[0].meta.created_at, 1_700_000_000 - 18_000);
    assert_eq!(
        listed[0].meta.changed.keys().collect::<Vec<_>>(),
        vec!["2", "3", "4", "5"]
    );

    let preview = revisions.preview(10, revision_id, &form)?;
    assert!(!preview.identical);
    assert_eq!(preview.diff.field_ids(), vec!["2", "3", "4", "5"]);
    let guests = preview.diff.get("3").map(|d| d.split_rows()).unwrap_or_default();
    assert!(guests
        .iter()
        .any(|row| row.changed && row.right.as_deref() == Some("Row 2: Cy, Jones")));

    host.clock.advance(600);
    let summaries = revisions.summaries(10, &form)?;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].author, "Editor");
    assert_eq!(summaries[0].time_ago, "10 mins");

    let token = revisions.restore_token(10, revision_id)?;
    revisions.restore_with_token(&form, 10, revision_id, &token)?;
    let restored = host.records.get(10)?.unwrap_or_default();
    assert_eq!(restored.get("2"), Some(&json!("[\"v1\",\"v3\"]")));
    assert_eq!(restored.get("5"), Some(&json!("")));
    assert!(!restored.contains_key("_revision"));
    assert_eq!(host.records.observed_updates(), 0);

    // Restoring does not itself create a revision, and the revision is kept
    assert_eq!(revisions.revisions(10)?.len(), 1);
    assert!(revisions.preview(10, revision_id, &form)?.identical);
    assert!(revisions.summaries(10, &form)?.is_empty());
    Ok(())
}

#[test]
fn restore_preserves_host_metadata_by_default() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    host.records.insert(
        5,
        snapshot(json!({"id": 5, "status": "archived", "workflow_step": "1", "field1": "OLD"})),
    )?;
    update_entry(
        &revisions,
        &host,
        5,
        json!({"id": 5, "status": "active", "workflow_step": "2", "field1": "X"}),
    )?;

    let revision_id = revisions.revisions(5)?[0].id();
    revisions.restore(&contact_form(), 5, revision_id)?;
    assert_eq!(
        host.records.get(5)?,
        Some(snapshot(json!({"id": 5, "status": "active", "workflow_step": "2", "field1": "OLD"})))
    );
    Ok(())
}

#[test]
fn restore_can_delete_the_revision() -> anyhow::Result<()> {
    let config = RevisionsConfig {
        delete_revision_after_restore: true,
        ..RevisionsConfig::default()
    };
    let (revisions, host) = revisions_with(config)?;
    host.records.insert(8, snapshot(json!({"id": 8, "1": "first"})))?;
    update_entry(&revisions, &host, 8, json!({"id": 8, "1": "second"}))?;
    host.clock.advance(5);
    update_entry(&revisions, &host, 8, json!({"id": 8, "1": "third"}))?;

    let listed = revisions.revisions(8)?;
    let ids: Vec<i64> = listed.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![1_700_000_005, 1_700_000_000]);

    revisions.restore(&contact_form(), 8, 1_700_000_000)?;
    assert_eq!(host.records.get(8)?.and_then(|r| r.get("1").cloned()), Some(json!("first")));
    let ids: Vec<i64> = revisions.revisions(8)?.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![1_700_000_005]);
    Ok(())
}

#[test]
fn failed_restores_change_nothing() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    host.records.insert(4, snapshot(json!({"id": 4, "1": "before"})))?;
    update_entry(&revisions, &host, 4, json!({"id": 4, "1": "after"}))?;
    let before = host.records.get(4)?;

    assert!(matches!(
        revisions.restore(&contact_form(), 4, 42),
        Err(RevisionError::RevisionNotFound {
            record_id: 4,
            revision_id: 42
        })
    ));

    let token = revisions.restore_token(4, 1_700_000_000)?;
    assert!(matches!(
        revisions.restore_with_token(&contact_form(), 4, 1_700_000_001, &token),
        Err(RevisionError::InvalidToken)
    ));

    host.records.reject_updates(Some("entry is locked"));
    match revisions.restore(&contact_form(), 4, 1_700_000_000) {
        Err(RevisionError::HostUpdate(message)) => assert_eq!(message, "entry is locked"),
        other => panic!("expected a host update error, got {:?}", other.err()),
    }

    assert_eq!(host.records.get(4)?, before);
    assert_eq!(revisions.revisions(4)?.len(), 1);
    Ok(())
}

#[test]
fn loosely_equal_updates_record_nothing() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    host.records.insert(6, snapshot(json!({"1": "10", "5": null, "2": "[\"v1\"]"})))?;
    assert!(!update_entry(&revisions, &host, 6, json!({"1": 10, "5": "", "2": "[\"v1\"]"}))?);
    // a field that appears for the first time is not a change
    let with_new_field = json!({"1": 10, "5": "", "2": "[\"v1\"]", "9": "new"});
    assert!(!update_entry(&revisions, &host, 6, with_new_field)?);
    assert!(revisions.revisions(6)?.is_empty());
    assert!(host.notes.notes().is_empty());
    Ok(())
}

#[test]
fn notes_without_revisions() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    let form = contact_form();

    let name = FieldSchema::new("1", FieldType::Plain, "Name");
    revisions.note_inline_edit(7, &name, &json!("Ann"), &json!("Anna"))?;

    let original = snapshot(json!({"1": "Anna", "5": ""}));
    let approved = snapshot(json!({"1": "Anna", "5": "Approved"}));
    assert!(revisions.note_workflow_update(&form, 7, &original, &approved)?);
    assert!(!revisions.note_workflow_update(&form, 7, &original, &original)?);

    let notes = host.notes.notes();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].text, "Field Name\n  -- From: Ann\n  -- To: Anna\r\n\n");
    assert_eq!(notes[1].actor_name, WORKFLOW_NOTE_AUTHOR);
    assert_eq!(notes[1].text, "Field Address\n  -- From: \n  -- To: Approved\r\n\n");
    assert!(revisions.revisions(7)?.is_empty());
    Ok(())
}

#[test]
fn purge_and_delete() -> anyhow::Result<()> {
    let (revisions, host) = revisions_with(RevisionsConfig::default())?;
    host.records.insert(9, snapshot(json!({"1": "a"})))?;
    update_entry(&revisions, &host, 9, json!({"1": "b"}))?;
    host.clock.advance(1);
    update_entry(&revisions, &host, 9, json!({"1": "c"}))?;

    assert!(!revisions.delete_revision(9, 12)?);
    assert!(revisions.delete_revision(9, 1_700_000_001)?);
    assert_eq!(revisions.revisions(9)?.len(), 1);
    assert!(revisions.purge(9)?);
    assert!(revisions.revisions(9)?.is_empty());
    assert!(!revisions.purge(9)?);
    Ok(())
}
