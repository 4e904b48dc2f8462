use chrono::DateTime;
use serde::Serialize;

use crate::diff::DiffResult;
use crate::types::{Revision, RevisionId};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// What a revision list needs to render one entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevisionSummary {
    pub revision_id: RevisionId,
    pub actor_id: u64,
    pub author: String,
    /// Site-local creation date, e.g. "March 4, 2024 @ 09:15:02".
    pub date: String,
    /// Age relative to now, e.g. "5 mins".
    pub time_ago: String,
    /// Fields that differ from the current record.
    pub fields: Vec<String>,
}

impl RevisionSummary {
    pub fn new(revision: &Revision, author: String, now_gmt: i64, diff: &DiffResult) -> Self {
        Self {
            revision_id: revision.id(),
            actor_id: revision.meta.actor_id,
            author,
            date: format_revision_date(revision.meta.created_at),
            time_ago: human_time_diff(revision.meta.created_at_gmt, now_gmt),
            fields: diff.field_ids().into_iter().map(String::from).collect(),
        }
    }
}

/// One revision next to its diff against the current record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevisionPreview {
    pub revision: Revision,
    pub diff: DiffResult,
    /// No field differs from the current record.
    pub identical: bool,
}

impl RevisionPreview {
    pub fn new(revision: Revision, diff: DiffResult) -> Self {
        let identical = diff.is_empty();
        Self {
            revision,
            diff,
            identical,
        }
    }
}

/// Formats a site-local unix timestamp. The timestamp already carries the
/// site offset, so it is rendered without further zone conversion.
pub fn format_revision_date(local_timestamp: i64) -> String {
    match DateTime::from_timestamp(local_timestamp, 0) {
        Some(date) => date.format("%B %-d, %Y @ %H:%M:%S").to_string(),
        None => local_timestamp.to_string(),
    }
}

/// Rounded distance between two timestamps in the largest fitting unit.
pub fn human_time_diff(from: i64, to: i64) -> String {
    let diff = (to - from).abs();
    let (count, unit) = if diff < HOUR {
        (rounded(diff, MINUTE), "min")
    } else if diff < DAY {
        (rounded(diff, HOUR), "hour")
    } else if diff < WEEK {
        (rounded(diff, DAY), "day")
    } else if diff < MONTH {
        (rounded(diff, WEEK), "week")
    } else if diff < YEAR {
        (rounded(diff, MONTH), "month")
    } else {
        (rounded(diff, YEAR), "year")
    };
    let count = count.max(1);
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

fn rounded(diff: i64, unit: i64) -> i64 {
    (diff + unit / 2) / unit
}
