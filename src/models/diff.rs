//! Line-level change records produced by the diff reducer.

use serde::{Deserialize, Serialize};

/// The kind of a contiguous run of lines in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    /// Lines present only in the new text.
    Added,
    /// Lines present only in the old text.
    Removed,
    /// Lines present in both texts.
    Unchanged,
}

/// One contiguous run of lines sharing a [`ChangeKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// First line of the run (1-based). Counted in the new text for added
    /// and unchanged runs, in the old text for removed runs.
    pub line_number: u32,
    /// Number of lines in the run.
    pub line_count: u32,
    /// The lines of the run, joined with `\n` (no trailing newline).
    pub text: String,
}

impl ChangeRecord {
    /// Inclusive line range covered by this run.
    pub fn range(&self) -> LineRange {
        LineRange {
            start: self.line_number,
            end: self.line_number + self.line_count.saturating_sub(1),
        }
    }

    pub fn is_added(&self) -> bool {
        self.kind == ChangeKind::Added
    }
}

/// An inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
