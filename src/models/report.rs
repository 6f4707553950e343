//! Review report types handed to the output renderers.

use std::path::PathBuf;

use serde::Serialize;

use super::analysis::AnalysisBundle;
use super::lint::LintSeverity;
use super::ChangeSetSource;

/// Whether a run reviewed one file or a resolved change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewMode {
    Single,
    Batch,
}

/// One reviewed file: its bundle plus the LLM narrative, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub bundle: AnalysisBundle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_error: Option<String>,
}

impl ReportEntry {
    /// An entry for analysis-only runs.
    pub fn analysis_only(bundle: AnalysisBundle) -> Self {
        Self {
            bundle,
            review: None,
            review_error: None,
        }
    }
}

/// A file dropped from a batch run and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The complete result of a review run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub mode: ReviewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ChangeSetSource>,
    /// Entries in discovery order.
    pub entries: Vec<ReportEntry>,
    pub skipped: Vec<SkippedFile>,
    /// Set when the run was cut short by an interrupt.
    pub interrupted: bool,
}

/// Aggregate counts over a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files: usize,
    pub skipped: usize,
    pub lint_errors: usize,
    pub lint_warnings: usize,
    pub untested_ranges: usize,
    pub edge_cases: usize,
}

impl Summary {
    pub fn from_report(report: &ReviewReport) -> Self {
        let mut s = Summary {
            files: report.entries.len(),
            skipped: report.skipped.len(),
            ..Default::default()
        };
        for entry in &report.entries {
            let b = &entry.bundle;
            s.lint_errors += b.lint_count(LintSeverity::Error);
            s.lint_warnings += b.lint_count(LintSeverity::Warning);
            s.untested_ranges += b.coverage().untested.len();
            s.edge_cases += b.edge_cases().len();
        }
        s
    }
}
