//! Per-file analyzer results and the aggregated analysis bundle.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::diff::{ChangeRecord, LineRange};
use super::lint::{LintIssue, LintSeverity};

/// One-hop import relationships of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyResult {
    /// Files this file imports directly.
    pub dependencies: IndexSet<PathBuf>,
    /// Files that import this file directly.
    pub dependents: IndexSet<PathBuf>,
}

impl DependencyResult {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.dependents.is_empty()
    }
}

/// How a coverage figure was obtained.
///
/// Only the presence heuristic exists; the tag travels with every estimate
/// so renderers never present it as measured coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CoverageBasis {
    #[default]
    PresenceHeuristic,
}

/// Estimated test coverage for a changed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEstimate {
    /// Estimated ratio in `[0, 1]`.
    pub coverage: f64,
    pub basis: CoverageBasis,
    /// Candidate test files found on disk.
    pub test_files: Vec<PathBuf>,
    /// Added line ranges not known to be exercised.
    pub untested: Vec<LineRange>,
    pub suggestion: String,
}

/// Ordered testing suggestions, in detection order.
pub type EdgeCaseList = Vec<String>;

/// Everything the analyzers produced for one file.
///
/// Immutable once built; a retry builds a new bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBundle {
    path: PathBuf,
    changes: Vec<ChangeRecord>,
    lint_issues: Vec<LintIssue>,
    dependencies: DependencyResult,
    coverage: CoverageEstimate,
    edge_cases: EdgeCaseList,
}

impl AnalysisBundle {
    pub fn new(
        path: PathBuf,
        changes: Vec<ChangeRecord>,
        lint_issues: Vec<LintIssue>,
        dependencies: DependencyResult,
        coverage: CoverageEstimate,
        edge_cases: EdgeCaseList,
    ) -> Self {
        Self {
            path,
            changes,
            lint_issues,
            dependencies,
            coverage,
            edge_cases,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn lint_issues(&self) -> &[LintIssue] {
        &self.lint_issues
    }

    pub fn dependencies(&self) -> &DependencyResult {
        &self.dependencies
    }

    pub fn coverage(&self) -> &CoverageEstimate {
        &self.coverage
    }

    pub fn edge_cases(&self) -> &[String] {
        &self.edge_cases
    }

    /// Total number of added lines across all change runs.
    pub fn added_lines(&self) -> u32 {
        self.changes
            .iter()
            .filter(|c| c.is_added())
            .map(|c| c.line_count)
            .sum()
    }

    /// Number of lint issues at the given severity.
    pub fn lint_count(&self, severity: LintSeverity) -> usize {
        self.lint_issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::diff::ChangeKind;

    fn bundle() -> AnalysisBundle {
        AnalysisBundle::new(
            PathBuf::from("/p/a.js"),
            vec![
                ChangeRecord {
                    kind: ChangeKind::Removed,
                    line_number: 1,
                    line_count: 2,
                    text: "x\ny".into(),
                },
                ChangeRecord {
                    kind: ChangeKind::Added,
                    line_number: 1,
                    line_count: 3,
                    text: "a\nb\nc".into(),
                },
            ],
            vec![LintIssue::unavailable("boom")],
            DependencyResult::default(),
            CoverageEstimate {
                coverage: 0.0,
                basis: CoverageBasis::PresenceHeuristic,
                test_files: vec![],
                untested: vec![LineRange { start: 1, end: 3 }],
                suggestion: "add tests".into(),
            },
            vec![],
        )
    }

    #[test]
    fn added_lines_counts_only_additions() {
        assert_eq!(bundle().added_lines(), 3);
    }

    #[test]
    fn lint_count_by_severity() {
        let b = bundle();
        assert_eq!(b.lint_count(LintSeverity::Warning), 1);
        assert_eq!(b.lint_count(LintSeverity::Error), 0);
    }

    #[test]
    fn coverage_basis_is_labelled_in_json() {
        let json = serde_json::to_value(bundle()).unwrap();
        assert_eq!(json["coverage"]["basis"], "presence-heuristic");
        assert_eq!(json["path"], "/p/a.js");
    }
}
