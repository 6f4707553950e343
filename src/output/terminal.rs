//! Terminal renderer: styled flowing text grouped by file.

use colored::Colorize;

use crate::models::{LintSeverity, ReviewReport, Summary};
use crate::output::{ReportRenderer, has_reviews, join_paths};

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl ReportRenderer for TerminalRenderer {
    fn render(&self, report: &ReviewReport) -> String {
        let mut output = String::new();

        if report.entries.is_empty() {
            output.push_str(&format!("{}", "  No files were analyzed.\n".yellow()));
        }

        for entry in &report.entries {
            let b = &entry.bundle;
            output.push_str(&format!(
                " {} {}  {}\n",
                "▸".cyan().bold(),
                b.path().display().to_string().bold(),
                format!("+{} lines", b.added_lines()).dimmed()
            ));

            if b.lint_issues().is_empty() {
                output.push_str(&format!("   {}  {}\n", "lint ".dimmed(), "no issues".green()));
            }
            for issue in b.lint_issues() {
                let (icon, severity) = match issue.severity {
                    LintSeverity::Error => ("✖".red().bold().to_string(), "error".red().bold().to_string()),
                    LintSeverity::Warning => (
                        "⚠".yellow().bold().to_string(),
                        "warning".yellow().bold().to_string(),
                    ),
                };
                let rule = issue
                    .rule_id
                    .as_deref()
                    .map(|r| format!(" ({r})").dimmed().to_string())
                    .unwrap_or_default();
                output.push_str(&format!(
                    "   {}  {icon} {}:{} {severity} {}{rule}\n",
                    "lint ".dimmed(),
                    issue.line,
                    issue.column,
                    issue.message
                ));
            }

            let deps = b.dependencies();
            output.push_str(&format!(
                "   {}  imports: {} · imported by: {}\n",
                "deps ".dimmed(),
                join_paths(deps.dependencies.iter().map(|p| p.as_path())),
                join_paths(deps.dependents.iter().map(|p| p.as_path())),
            ));

            let coverage = b.coverage();
            let mut tests = format!(
                "estimated {:.0}% ({})",
                coverage.coverage * 100.0,
                coverage.basis
            );
            if !coverage.untested.is_empty() {
                let ranges: Vec<String> = coverage.untested.iter().map(ToString::to_string).collect();
                tests.push_str(&format!(" · untested lines {}", ranges.join(", ")));
            }
            output.push_str(&format!("   {}  {tests}\n", "tests".dimmed()));
            output.push_str(&format!("          {} {}\n", "→".cyan(), coverage.suggestion));

            for suggestion in b.edge_cases() {
                output.push_str(&format!("   {}  • {suggestion}\n", "edge ".dimmed()));
            }

            if let Some(ref review) = entry.review {
                output.push_str(&format!("   {}\n", "review".cyan().bold()));
                for line in review.lines() {
                    output.push_str(&format!("     {line}\n"));
                }
            }
            if let Some(ref err) = entry.review_error {
                output.push_str(&format!("   {} {}\n", "review failed:".red().bold(), err));
            }
            output.push('\n');
        }

        for skipped in &report.skipped {
            output.push_str(&format!(
                " {} {} {}\n",
                "–".yellow().bold(),
                skipped.path.display(),
                format!("skipped: {}", skipped.reason).yellow()
            ));
        }
        if report.interrupted {
            output.push_str(&format!(" {}\n", "Interrupted; showing completed files only.".yellow().bold()));
        }

        let summary = Summary::from_report(report);
        output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));
        output.push_str(&format!(
            " {} {}: {} lint {}, {} {}, {} untested {}, {} edge {}",
            summary.files.to_string().bold(),
            if summary.files == 1 { "file" } else { "files" },
            summary.lint_errors.to_string().red().bold(),
            if summary.lint_errors == 1 { "error" } else { "errors" },
            summary.lint_warnings.to_string().yellow().bold(),
            if summary.lint_warnings == 1 { "warning" } else { "warnings" },
            summary.untested_ranges.to_string().bold(),
            if summary.untested_ranges == 1 { "range" } else { "ranges" },
            summary.edge_cases.to_string().bold(),
            if summary.edge_cases == 1 { "case" } else { "cases" },
        ));
        if summary.skipped > 0 {
            output.push_str(&format!(", {} skipped", summary.skipped.to_string().yellow().bold()));
        }
        output.push('\n');
        if has_reviews(report) {
            output.push_str(&format!(" {}\n", crate::constants::AI_DISCLOSURE.dimmed()));
        }

        output
    }
}
