//! Markdown renderer for report files.

use std::fmt::Write as _;

use crate::constants::{AI_DISCLOSURE, APP_NAME};
use crate::models::{ReviewMode, ReviewReport, Summary};
use crate::output::{ReportRenderer, has_reviews, join_paths};

/// Markdown report renderer.
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn render(&self, report: &ReviewReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {APP_NAME} review\n");

        let mode = match (report.mode, report.source) {
            (ReviewMode::Batch, Some(source)) => format!("batch ({source})"),
            (mode, _) => mode.to_string(),
        };
        let summary = Summary::from_report(report);
        let _ = writeln!(
            out,
            "Mode: {mode} · Files: {} · Lint errors: {} · Lint warnings: {} · Skipped: {}\n",
            summary.files, summary.lint_errors, summary.lint_warnings, summary.skipped
        );
        if report.interrupted {
            out.push_str("> **Interrupted:** only completed files are listed.\n\n");
        }

        for entry in &report.entries {
            let b = &entry.bundle;
            let _ = writeln!(out, "## `{}`\n", b.path().display());

            out.push_str("### Lint\n\n");
            if b.lint_issues().is_empty() {
                out.push_str("No issues.\n\n");
            } else {
                out.push_str("| Line | Severity | Message | Rule |\n|---|---|---|---|\n");
                for issue in b.lint_issues() {
                    let _ = writeln!(
                        out,
                        "| {}:{} | {} | {} | {} |",
                        issue.line,
                        issue.column,
                        issue.severity,
                        issue.message.replace('|', "\\|"),
                        issue.rule_id.as_deref().unwrap_or("")
                    );
                }
                out.push('\n');
            }

            let deps = b.dependencies();
            out.push_str("### Dependencies\n\n");
            let _ = writeln!(
                out,
                "- Imports: {}",
                join_paths(deps.dependencies.iter().map(|p| p.as_path()))
            );
            let _ = writeln!(
                out,
                "- Imported by: {}\n",
                join_paths(deps.dependents.iter().map(|p| p.as_path()))
            );

            let coverage = b.coverage();
            out.push_str("### Tests (estimated)\n\n");
            let _ = writeln!(
                out,
                "- Estimated coverage: {:.0}% ({}, not measured)",
                coverage.coverage * 100.0,
                coverage.basis
            );
            let _ = writeln!(
                out,
                "- Candidate test files: {}",
                join_paths(coverage.test_files.iter().map(|p| p.as_path()))
            );
            if !coverage.untested.is_empty() {
                let ranges: Vec<String> = coverage.untested.iter().map(ToString::to_string).collect();
                let _ = writeln!(out, "- Possibly untested lines: {}", ranges.join(", "));
            }
            let _ = writeln!(out, "- {}\n", coverage.suggestion);

            if !b.edge_cases().is_empty() {
                out.push_str("### Edge cases\n\n");
                for suggestion in b.edge_cases() {
                    let _ = writeln!(out, "- {suggestion}");
                }
                out.push('\n');
            }

            if let Some(ref review) = entry.review {
                let _ = writeln!(out, "### Review\n\n{}\n", review.trim());
            } else if let Some(ref err) = entry.review_error {
                let _ = writeln!(out, "### Review\n\n_Review failed: {err}_\n");
            }
        }

        if !report.skipped.is_empty() {
            out.push_str("## Skipped\n\n");
            for skipped in &report.skipped {
                let _ = writeln!(out, "- `{}`: {}", skipped.path.display(), skipped.reason);
            }
            out.push('\n');
        }

        if has_reviews(report) {
            let _ = writeln!(out, "---\n\n_{AI_DISCLOSURE}_");
        }
        out
    }
}
