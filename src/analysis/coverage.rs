//! Test coverage estimation by test-file presence.
//!
//! Nothing is executed: an estimate only reflects whether files named like
//! tests for the changed file exist. Every result carries
//! [`CoverageBasis::PresenceHeuristic`] so it is never shown as measured.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::models::{ChangeRecord, CoverageBasis, CoverageEstimate, LineRange};

const NO_TESTS_SUGGESTION: &str = "No tests found, consider adding tests.";

/// Looks for candidate test files next to a file and in the project's
/// conventional test directories.
#[derive(Debug, Clone)]
pub struct CoverageEstimator {
    project_root: PathBuf,
    test_dirs: Vec<String>,
    presumed_coverage: f64,
}

impl CoverageEstimator {
    pub fn new(project_root: impl Into<PathBuf>, config: &AnalysisConfig) -> Self {
        Self {
            project_root: project_root.into(),
            test_dirs: config.test_dirs.clone(),
            presumed_coverage: config.presumed_coverage.clamp(0.0, 1.0),
        }
    }

    /// Estimate coverage of `changes` in `file`. Never fails.
    pub async fn estimate(&self, file: &Path, changes: &[ChangeRecord]) -> CoverageEstimate {
        let untested: Vec<LineRange> = changes
            .iter()
            .filter(|c| c.is_added())
            .map(ChangeRecord::range)
            .collect();

        let test_files = match self.find_test_files(file).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "coverage estimation failed");
                return CoverageEstimate {
                    coverage: 0.0,
                    basis: CoverageBasis::PresenceHeuristic,
                    test_files: Vec::new(),
                    untested: Vec::new(),
                    suggestion: format!("Test coverage could not be estimated: {e}"),
                };
            }
        };

        if test_files.is_empty() {
            return CoverageEstimate {
                coverage: 0.0,
                basis: CoverageBasis::PresenceHeuristic,
                test_files,
                untested,
                suggestion: NO_TESTS_SUGGESTION.to_string(),
            };
        }

        let suggestion = format!(
            "Found {} candidate test file{}; verify they exercise the changed lines.",
            test_files.len(),
            if test_files.len() == 1 { "" } else { "s" }
        );
        CoverageEstimate {
            coverage: self.presumed_coverage,
            basis: CoverageBasis::PresenceHeuristic,
            test_files,
            untested,
            suggestion,
        }
    }

    /// Directories searched for candidates, in search order, deduplicated.
    fn scopes(&self, file: &Path) -> Vec<PathBuf> {
        let mut scopes: Vec<PathBuf> = Vec::new();
        let own_dir = file.parent().map(Path::to_path_buf);
        for dir in own_dir
            .into_iter()
            .chain(self.test_dirs.iter().map(|d| self.project_root.join(d)))
        {
            if !scopes.contains(&dir) {
                scopes.push(dir);
            }
        }
        scopes
    }

    async fn find_test_files(&self, file: &Path) -> io::Result<Vec<PathBuf>> {
        let Some(base) = file.file_stem().and_then(|s| s.to_str()) else {
            return Ok(Vec::new());
        };
        let prefixes = candidate_prefixes(base);

        let mut found = Vec::new();
        for scope in self.scopes(file) {
            let mut entries = match tokio::fs::read_dir(&scope).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            let mut in_scope = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if is_candidate(name, &prefixes) && entry.file_type().await?.is_file() {
                    in_scope.push(entry.path());
                }
            }
            in_scope.sort();
            found.extend(in_scope);
        }
        Ok(found)
    }
}

/// `{base}.test.*`, `{base}.spec.*`, `test-{base}.*`, `{base}-test.*`,
/// `test_{base}.*`, `{base}_test.*`
fn candidate_prefixes(base: &str) -> Vec<String> {
    vec![
        format!("{base}.test."),
        format!("{base}.spec."),
        format!("test-{base}."),
        format!("{base}-test."),
        format!("test_{base}."),
        format!("{base}_test."),
    ]
}

fn is_candidate(name: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|p| name.len() > p.len() && name.starts_with(p.as_str()))
}
