//! Prompt construction from analysis bundles.
//!
//! The system prompt is fixed; the file prompt renders one bundle's diff
//! and analyzer results as markdown sections.

use std::fmt::Write as _;
use std::path::Path;

use crate::models::{AnalysisBundle, ChangeKind, ChangeRecord};

/// Unchanged lines kept on each side of a change.
const CONTEXT_LINES: usize = 3;

/// The reviewer's standing instructions.
pub fn build_system_prompt() -> String {
    "You are a senior software engineer reviewing a code change.\n\n\
     You receive the diff of one file together with the output of several \
     lightweight analyzers: lint issues, direct dependencies and dependents, \
     an estimated test coverage and suggested edge cases. The analyzers are \
     heuristic and may be wrong; treat them as hints, not facts.\n\n\
     Write a concise review in markdown:\n\
     - Point out bugs, risky changes and missing error handling, citing line numbers.\n\
     - Mention callers (dependents) that may be affected by the change.\n\
     - Recommend the most valuable tests to add for the changed lines.\n\
     - Do not restate the diff. If the change looks fine, say so briefly."
        .to_string()
}

/// Render the user prompt for one file.
///
/// `diff` is the change sequence including unchanged runs, as produced by
/// [`reduce_with_context`](crate::diff::reduce_with_context).
pub fn build_file_prompt(bundle: &AnalysisBundle, diff: &[ChangeRecord]) -> String {
    let path = bundle.path().display();
    let mut prompt = String::new();

    let _ = writeln!(prompt, "## Diff for: {path}\n\n```diff");
    prompt.push_str(&render_diff(diff));
    prompt.push_str("```\n\n");

    prompt.push_str("## Lint Issues\n\n");
    if bundle.lint_issues().is_empty() {
        prompt.push_str("None reported.\n\n");
    } else {
        for issue in bundle.lint_issues() {
            let rule = issue
                .rule_id
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            let _ = writeln!(
                prompt,
                "- {}:{} {}: {}{rule}",
                issue.line, issue.column, issue.severity, issue.message
            );
        }
        prompt.push('\n');
    }

    let deps = bundle.dependencies();
    prompt.push_str("## Dependencies (direct)\n\n");
    push_paths(&mut prompt, "Imports", deps.dependencies.iter().map(|p| p.as_path()));
    push_paths(&mut prompt, "Imported by", deps.dependents.iter().map(|p| p.as_path()));
    prompt.push('\n');

    let coverage = bundle.coverage();
    prompt.push_str("## Test Coverage (estimated from test-file presence, not measured)\n\n");
    let _ = writeln!(prompt, "Estimated coverage: {:.0}%", coverage.coverage * 100.0);
    push_paths(&mut prompt, "Candidate test files", coverage.test_files.iter().map(|p| p.as_path()));
    if !coverage.untested.is_empty() {
        let ranges: Vec<String> = coverage.untested.iter().map(ToString::to_string).collect();
        let _ = writeln!(prompt, "Possibly untested lines: {}", ranges.join(", "));
    }
    let _ = writeln!(prompt, "{}\n", coverage.suggestion);

    if !bundle.edge_cases().is_empty() {
        prompt.push_str("## Suggested Edge Cases\n\n");
        for suggestion in bundle.edge_cases() {
            let _ = writeln!(prompt, "- {suggestion}");
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "## Instructions\n\n\
         Review the changes to `{path}` using the analysis above."
    );
    prompt
}

fn push_paths<'a>(prompt: &mut String, label: &str, paths: impl Iterator<Item = &'a Path>) {
    let list: Vec<String> = paths.map(|p| format!("`{}`", p.display())).collect();
    if list.is_empty() {
        let _ = writeln!(prompt, "{label}: none");
    } else {
        let _ = writeln!(prompt, "{label}: {}", list.join(", "));
    }
}

/// Unified-style rendering; long unchanged runs are trimmed to
/// [`CONTEXT_LINES`] on each side of a change.
fn render_diff(diff: &[ChangeRecord]) -> String {
    let mut out = String::new();
    for (i, record) in diff.iter().enumerate() {
        let lines: Vec<&str> = record.text.split('\n').collect();
        match record.kind {
            ChangeKind::Added => push_lines(&mut out, '+', &lines),
            ChangeKind::Removed => push_lines(&mut out, '-', &lines),
            ChangeKind::Unchanged => {
                let keep_head = if i > 0 { CONTEXT_LINES } else { 0 };
                let keep_tail = if i + 1 < diff.len() { CONTEXT_LINES } else { 0 };
                if lines.len() <= keep_head + keep_tail {
                    push_lines(&mut out, ' ', &lines);
                    continue;
                }
                push_lines(&mut out, ' ', &lines[..keep_head]);
                if keep_tail > 0 {
                    let tail_start = lines.len() - keep_tail;
                    let _ = writeln!(out, "@@ line {} @@", record.line_number as usize + tail_start);
                    push_lines(&mut out, ' ', &lines[tail_start..]);
                }
            }
        }
    }
    out
}

fn push_lines(out: &mut String, prefix: char, lines: &[&str]) {
    for line in lines {
        out.push(prefix);
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::diff::reduce_with_context;
    use crate::models::{CoverageBasis, CoverageEstimate, DependencyResult, LineRange, LintIssue};

    fn bundle(lint: Vec<LintIssue>, edge_cases: Vec<String>) -> AnalysisBundle {
        let mut deps = DependencyResult::default();
        deps.dependents.insert(PathBuf::from("/p/src/app.js"));
        AnalysisBundle::new(
            PathBuf::from("/p/src/util.js"),
            vec![],
            lint,
            deps,
            CoverageEstimate {
                coverage: 0.0,
                basis: CoverageBasis::PresenceHeuristic,
                test_files: vec![],
                untested: vec![LineRange { start: 2, end: 4 }],
                suggestion: "No tests found, consider adding tests.".into(),
            },
            edge_cases,
        )
    }

    #[test]
    fn system_prompt_mentions_heuristics() {
        assert!(build_system_prompt().contains("heuristic"));
    }

    #[test]
    fn file_prompt_has_all_sections() {
        let diff = reduce_with_context("a\nb\n", "a\nc\n");
        let prompt = build_file_prompt(
            &bundle(
                vec![LintIssue::unavailable("parse error")],
                vec!["Test with empty arrays".into()],
            ),
            &diff,
        );

        assert!(prompt.contains("## Diff for: /p/src/util.js"));
        assert!(prompt.contains(" a\n-b\n+c\n"));
        assert!(prompt.contains("1:1 warning: Static analysis unavailable: parse error"));
        assert!(prompt.contains("Imports: none"));
        assert!(prompt.contains("Imported by: `/p/src/app.js`"));
        assert!(prompt.contains("estimated from test-file presence, not measured"));
        assert!(prompt.contains("Estimated coverage: 0%"));
        assert!(prompt.contains("- Test with empty arrays"));
        assert!(prompt.contains("## Instructions"));
    }

    #[test]
    fn empty_sections_are_stated_or_omitted() {
        let prompt = build_file_prompt(&bundle(vec![], vec![]), &[]);
        assert!(prompt.contains("## Lint Issues\n\nNone reported."));
        assert!(!prompt.contains("## Suggested Edge Cases"));
    }

    #[test]
    fn long_unchanged_runs_are_trimmed() {
        let old: String = (1..=20).map(|i| format!("line{i}\n")).collect();
        let new = old.replace("line10\n", "changed\n");
        let rendered = render_diff(&reduce_with_context(&old, &new));

        assert!(!rendered.contains(" line6\n"));
        assert!(rendered.contains("@@ line 7 @@\n line7\n line8\n line9\n-line10\n+changed\n"));
        assert!(rendered.contains(" line11\n line12\n line13\n"));
        assert!(!rendered.contains("line14"));
    }
}
