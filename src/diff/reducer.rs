//! Line-level diff reduction.
//!
//! Turns two full-text versions of a file into ordered [`ChangeRecord`]
//! runs using the Myers algorithm from `similar`.

use similar::{Algorithm, DiffOp, TextDiff};

use crate::models::diff::{ChangeKind, ChangeRecord};

/// Old-side text used when a file has no committed version.
pub const NEW_FILE_SENTINEL: &str = "";

/// Diff `old` against `new`, returning only added and removed runs.
///
/// Identical inputs produce an empty vec. A replaced block yields its
/// removed run followed by its added run.
pub fn reduce(old: &str, new: &str) -> Vec<ChangeRecord> {
    collect_runs(old, new, false)
}

/// Like [`reduce`], but also emits the unchanged runs between changes.
pub fn reduce_with_context(old: &str, new: &str) -> Vec<ChangeRecord> {
    collect_runs(old, new, true)
}

fn collect_runs(old: &str, new: &str, include_unchanged: bool) -> Vec<ChangeRecord> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();

    let mut records = Vec::new();
    for op in diff.ops() {
        match *op {
            DiffOp::Equal { new_index, len, .. } => {
                if include_unchanged {
                    records.push(run(ChangeKind::Unchanged, new_index, &new_lines[new_index..new_index + len]));
                }
            }
            DiffOp::Delete { old_index, old_len, .. } => {
                records.push(run(ChangeKind::Removed, old_index, &old_lines[old_index..old_index + old_len]));
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                records.push(run(ChangeKind::Added, new_index, &new_lines[new_index..new_index + new_len]));
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                records.push(run(ChangeKind::Removed, old_index, &old_lines[old_index..old_index + old_len]));
                records.push(run(ChangeKind::Added, new_index, &new_lines[new_index..new_index + new_len]));
            }
        }
    }

    records
}

/// Build a record from a 0-based start index and the run's raw lines.
fn run(kind: ChangeKind, start: usize, lines: &[&str]) -> ChangeRecord {
    let text = lines
        .iter()
        .map(|l| l.trim_end_matches(['\n', '\r']))
        .collect::<Vec<_>>()
        .join("\n");

    ChangeRecord {
        kind,
        line_number: start as u32 + 1,
        line_count: lines.len() as u32,
        text,
    }
}
