pub mod changes;
pub mod clock;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod history;
pub mod host;
pub mod normalize;
pub mod recorder;
pub mod restore;
pub mod schema;
pub mod storage;
pub mod summary;
pub mod token;
pub mod types;

pub use config::{MetaKeyRule, RevisionsConfig};
pub use diff::{diff, DiffResult, FieldDiff};
pub use engine::{EntryRevisions, EntryRevisionsBuilder};
pub use error::{Result, RevisionError};
pub use history::RevisionStore;
pub use recorder::{EntrySource, RevisionRecorder};
pub use restore::{RestoreEngine, RestorePolicy};
pub use schema::{Choice, FieldSchema, FieldType, Form};
pub use summary::{RevisionPreview, RevisionSummary};
pub use types::{ChangeSet, RecordId, Revision, RevisionId, RevisionMeta, Snapshot, REVISION_KEY};
