//! Output renderers: terminal, JSON and markdown.

pub mod json;
pub mod markdown;
pub mod terminal;

use std::path::Path;

use crate::models::ReviewReport;

/// Renders a review report to an output format.
pub trait ReportRenderer {
    fn render(&self, report: &ReviewReport) -> String;
}

/// Comma-separated display of a path list, or `none`.
pub(crate) fn join_paths<'a>(paths: impl IntoIterator<Item = &'a Path>) -> String {
    let list: Vec<String> = paths.into_iter().map(|p| p.display().to_string()).collect();
    if list.is_empty() {
        "none".to_string()
    } else {
        list.join(", ")
    }
}

/// Whether any entry carries an LLM narrative.
pub(crate) fn has_reviews(report: &ReviewReport) -> bool {
    report.entries.iter().any(|e| e.review.is_some())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::PathBuf;

    use crate::models::{
        AnalysisBundle, ChangeKind, ChangeRecord, ChangeSetSource, CoverageBasis, CoverageEstimate,
        DependencyResult, LineRange, LintIssue, LintSeverity, ReportEntry, ReviewMode, ReviewReport,
        SkippedFile,
    };

    /// A batch report with one reviewed file and one skipped file.
    pub(crate) fn sample_report() -> ReviewReport {
        let mut deps = DependencyResult::default();
        deps.dependencies.insert(PathBuf::from("/p/src/math.js"));
        deps.dependents.insert(PathBuf::from("/p/src/app.js"));

        let bundle = AnalysisBundle::new(
            PathBuf::from("/p/src/util.js"),
            vec![ChangeRecord {
                kind: ChangeKind::Added,
                line_number: 2,
                line_count: 3,
                text: "a\nb\nc".into(),
            }],
            vec![LintIssue {
                message: "Unexpected 'debugger' statement.".into(),
                severity: LintSeverity::Error,
                line: 3,
                column: 5,
                rule_id: Some("no-debugger".into()),
            }],
            deps,
            CoverageEstimate {
                coverage: 0.5,
                basis: CoverageBasis::PresenceHeuristic,
                test_files: vec![PathBuf::from("/p/src/util.test.js")],
                untested: vec![LineRange { start: 2, end: 4 }],
                suggestion: "Found 1 candidate test file(s); verify they exercise the changed lines.".into(),
            },
            vec!["Test with empty arrays.".into()],
        );

        ReviewReport {
            mode: ReviewMode::Batch,
            source: Some(ChangeSetSource::VersionControl),
            entries: vec![ReportEntry {
                bundle,
                review: Some("Guard against an empty list on line 3.".into()),
                review_error: None,
            }],
            skipped: vec![SkippedFile {
                path: PathBuf::from("/p/src/gone.js"),
                reason: "path not found: /p/src/gone.js".into(),
            }],
            interrupted: false,
        }
    }
}
