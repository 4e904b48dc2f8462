use thiserror::Error;

use crate::types::{RecordId, RevisionId};

/// Errors surfaced by the revision engines.
///
/// Storage and host collaborator failures arrive as `anyhow::Error` and are
/// carried in `Storage`, except for the record commit during a restore which
/// is reported as `HostUpdate`.
#[derive(Error, Debug)]
pub enum RevisionError {
    #[error("Revision {revision_id} not found for record {record_id}")]
    RevisionNotFound {
        record_id: RecordId,
        revision_id: RevisionId,
    },

    #[error("Record {0} not found")]
    RecordNotFound(RecordId),

    #[error("Host update failed: {0}")]
    HostUpdate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid or expired restore token")]
    InvalidToken,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RevisionError>;

pub(crate) fn validate_record_id(record_id: RecordId) -> Result<()> {
    if record_id == 0 {
        return Err(RevisionError::Validation(
            "record id must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_ids(record_id: RecordId, revision_id: RevisionId) -> Result<()> {
    validate_record_id(record_id)?;
    if revision_id <= 0 {
        return Err(RevisionError::Validation(format!(
            "revision id must be a positive timestamp, got {}",
            revision_id
        )));
    }
    Ok(())
}
