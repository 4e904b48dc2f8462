use serde::Serialize;
use similar::{ChangeTag, TextDiff};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "line", rename_all = "lowercase")]
pub enum DiffLine {
    Same(String),
    Removed(String),
    Added(String),
}

/// One row of a side-by-side rendering. `None` marks a blank cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitRow {
    pub left: Option<String>,
    pub right: Option<String>,
    pub changed: bool,
}

/// Collapses whitespace the way the text diff compares it: trimmed, `\r`
/// folded into `\n`, newline runs and space/tab runs collapsed.
pub fn normalize_whitespace(text: &str) -> String {
    let folded = text.trim().replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(folded.len());
    let mut previous: Option<char> = None;
    for c in folded.chars() {
        let c = if c == '\t' { ' ' } else { c };
        if (c == '\n' || c == ' ') && previous == Some(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

/// Line diff of `left` against `right`. Returns an empty vec when the
/// whitespace-normalized texts are identical.
pub fn diff_lines(left: &str, right: &str) -> Vec<DiffLine> {
    let left = terminated(normalize_whitespace(left));
    let right = terminated(normalize_whitespace(right));
    if left == right {
        return Vec::new();
    }
    TextDiff::from_lines(&left, &right)
        .iter_all_changes()
        .map(|change| {
            let line = change.value().trim_end_matches('\n').to_string();
            match change.tag() {
                ChangeTag::Equal => DiffLine::Same(line),
                ChangeTag::Delete => DiffLine::Removed(line),
                ChangeTag::Insert => DiffLine::Added(line),
            }
        })
        .collect()
}

/// Every line ends in `\n` so a last line compares equal to the same line
/// followed by more text.
fn terminated(mut text: String) -> String {
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Pairs runs of removed and added lines into side-by-side rows.
pub fn split_rows(lines: &[DiffLine]) -> Vec<SplitRow> {
    let mut rows = Vec::new();
    let mut removed: Vec<String> = Vec::new();
    let mut added: Vec<String> = Vec::new();

    fn flush(rows: &mut Vec<SplitRow>, removed: &mut Vec<String>, added: &mut Vec<String>) {
        let count = removed.len().max(added.len());
        let mut left = removed.drain(..);
        let mut right = added.drain(..);
        for _ in 0..count {
            rows.push(SplitRow {
                left: left.next(),
                right: right.next(),
                changed: true,
            });
        }
    }

    for line in lines {
        match line {
            DiffLine::Removed(l) => removed.push(l.clone()),
            DiffLine::Added(l) => added.push(l.clone()),
            DiffLine::Same(l) => {
                flush(&mut rows, &mut removed, &mut added);
                rows.push(SplitRow {
                    left: Some(l.clone()),
                    right: Some(l.clone()),
                    changed: false,
                });
            }
        }
    }
    flush(&mut rows, &mut removed, &mut added);
    rows
}
