//! Change-set resolution for batch reviews.
//!
//! Resolution runs in order:
//! 1. ask version control which files changed since the last commit;
//! 2. if that fails or matches nothing, walk the directory instead;
//! 3. if there are more than [`MAX_FILES`] candidates, keep the most
//!    recently modified ones.
//!
//! An empty change set is a valid result; callers report it as
//! "nothing to review".

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use crate::config::{AnalysisConfig, ExclusionMatch};
use crate::constants::MAX_FILES;
use crate::diff::VersionControl;
use crate::models::{ChangeSet, ChangeSetSource};

/// Selects the files a batch review looks at.
#[derive(Clone)]
pub struct ChangeSetResolver {
    config: AnalysisConfig,
    vcs: Arc<dyn VersionControl>,
}

impl ChangeSetResolver {
    pub fn new(config: AnalysisConfig, vcs: Arc<dyn VersionControl>) -> Self {
        Self { config, vcs }
    }

    /// Resolve the change set for `dir`. Never fails.
    pub async fn resolve(&self, dir: &Path) -> ChangeSet {
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        let (candidates, source) = match self.discover_via_vcs(&dir).await {
            Some(paths) => (paths, ChangeSetSource::VersionControl),
            None => (self.scan(&dir).await, ChangeSetSource::Scan),
        };

        tracing::debug!(
            dir = %dir.display(),
            %source,
            candidates = candidates.len(),
            "resolved change set candidates"
        );

        ChangeSet::new(cap_by_recency(candidates), source)
    }

    /// Changed files reported by version control, or `None` to fall back.
    async fn discover_via_vcs(&self, dir: &Path) -> Option<Vec<PathBuf>> {
        let changed = match self.vcs.changed_files(dir).await {
            Ok(changed) => changed,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "falling back to directory scan");
                return None;
            }
        };

        let paths: Vec<PathBuf> = changed
            .iter()
            .map(|rel| dir.join(rel))
            .filter(|p| self.has_allowed_extension(p))
            .collect();

        if paths.is_empty() {
            tracing::debug!(dir = %dir.display(), "no matching changed files, falling back to directory scan");
            return None;
        }
        Some(paths)
    }

    /// Recursive walk honoring the extension allow-list and exclusions.
    async fn scan(&self, dir: &Path) -> Vec<PathBuf> {
        let resolver = self.clone();
        let dir = dir.to_path_buf();
        match tokio::task::spawn_blocking(move || resolver.scan_blocking(&dir)).await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(error = %e, "directory scan task failed");
                Vec::new()
            }
        }
    }

    fn scan_blocking(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| self.has_allowed_extension(p))
            .collect()
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.config.allows_extension(e))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        is_excluded(path, &self.config.exclude, self.config.exclusion_match)
    }
}

/// Whether `path` matches any exclusion token.
///
/// In substring mode a token anywhere in the full path matches, so `test`
/// also excludes `latest_release/`.
pub fn is_excluded(path: &Path, tokens: &[String], mode: ExclusionMatch) -> bool {
    match mode {
        ExclusionMatch::Substring => {
            let full = path.to_string_lossy();
            tokens.iter().any(|t| !t.is_empty() && full.contains(t.as_str()))
        }
        ExclusionMatch::Segment => path
            .components()
            .any(|c| tokens.iter().any(|t| c.as_os_str() == t.as_str())),
    }
}

/// Keep the [`MAX_FILES`] most recently modified paths.
///
/// Sets at or under the cap are returned untouched. The sort is stable, so
/// paths with equal modification times keep their discovery order.
pub fn cap_by_recency(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.len() <= MAX_FILES {
        return paths;
    }
    paths.sort_by_cached_key(|p| Reverse(modified_time(p)));
    paths.truncate(MAX_FILES);
    paths
}

fn modified_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffError;
    use async_trait::async_trait;
    use filetime::FileTime;
    use pretty_assertions::assert_eq;
    use std::fs;

    /// Version control stub: `None` behaves like "not a repository".
    struct FakeVcs(Option<Vec<&'static str>>);

    #[async_trait]
    impl VersionControl for FakeVcs {
        async fn changed_files(&self, _scope: &Path) -> Result<Vec<String>, DiffError> {
            match &self.0 {
                Some(files) => Ok(files.iter().map(|f| f.to_string()).collect()),
                None => Err(DiffError::VcsUnavailable("not a git repository".into())),
            }
        }

        async fn show_at_head(&self, path: &Path) -> Result<String, DiffError> {
            Err(DiffError::VcsUnavailable(path.display().to_string()))
        }
    }

    fn resolver(vcs: FakeVcs) -> ChangeSetResolver {
        ChangeSetResolver::new(AnalysisConfig::default(), Arc::new(vcs))
    }

    fn touch(path: &Path, mtime: i64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x\n").unwrap();
        filetime::set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    fn names(set: &ChangeSet) -> Vec<String> {
        set.paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn vcs_changes_are_used_in_report_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.js", "b.js", "c.js", "d.js"] {
            touch(&dir.path().join(name), 1_000);
        }

        let set = resolver(FakeVcs(Some(vec!["c.js", "a.js", "README.md"])))
            .resolve(dir.path())
            .await;
        assert_eq!(set.source(), ChangeSetSource::VersionControl);
        assert_eq!(names(&set), vec!["c.js", "a.js"]);
        assert!(set.paths().iter().all(|p| p.is_absolute()));
    }

    #[tokio::test]
    async fn vcs_failure_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.py"), 1_000);
        touch(&dir.path().join("a.ts"), 1_000);

        let set = resolver(FakeVcs(None)).resolve(dir.path()).await;
        assert_eq!(set.source(), ChangeSetSource::Scan);
        assert_eq!(names(&set), vec!["a.ts", "b.py"]);
    }

    #[tokio::test]
    async fn vcs_without_matching_extensions_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("main.rs"), 1_000);

        let set = resolver(FakeVcs(Some(vec!["notes.md"]))).resolve(dir.path()).await;
        assert_eq!(set.source(), ChangeSetSource::Scan);
        assert_eq!(names(&set), vec!["main.rs"]);
    }

    #[tokio::test]
    async fn scan_filters_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("App.JS"), 1_000);
        touch(&dir.path().join("README.md"), 1_000);
        touch(&dir.path().join("Makefile"), 1_000);

        let set = resolver(FakeVcs(None)).resolve(dir.path()).await;
        assert_eq!(names(&set), vec!["App.JS"]);
    }

    #[tokio::test]
    async fn scan_excludes_by_substring() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/app.js"), 1_000);
        touch(&dir.path().join("src/rebuild.js"), 1_000);
        touch(&dir.path().join("node_modules/lib/index.js"), 1_000);
        touch(&dir.path().join("dist/bundle.js"), 1_000);

        let set = resolver(FakeVcs(None)).resolve(dir.path()).await;
        assert_eq!(names(&set), vec!["app.js"]);
    }

    #[tokio::test]
    async fn segment_mode_only_matches_whole_components() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/rebuild.js"), 1_000);
        touch(&dir.path().join("build/out.js"), 1_000);

        let config = AnalysisConfig {
            exclusion_match: ExclusionMatch::Segment,
            ..AnalysisConfig::default()
        };
        let set = ChangeSetResolver::new(config, Arc::new(FakeVcs(None)))
            .resolve(dir.path())
            .await;
        assert_eq!(names(&set), vec!["rebuild.js"]);
    }

    #[tokio::test]
    async fn cap_keeps_most_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("f{i:02}.js")), 1_000 + i);
        }

        let set = resolver(FakeVcs(None)).resolve(dir.path()).await;
        assert_eq!(set.len(), MAX_FILES);
        let expected: Vec<String> = (10..20).rev().map(|i| format!("f{i:02}.js")).collect();
        assert_eq!(names(&set), expected);
    }

    #[tokio::test]
    async fn cap_with_tied_times_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("f{i:02}.js")), 1_000);
        }

        let r = resolver(FakeVcs(None));
        let first = r.resolve(dir.path()).await;
        let second = r.resolve(dir.path()).await;
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        let expected: Vec<String> = (0..10).map(|i| format!("f{i:02}.js")).collect();
        assert_eq!(names(&first), expected);
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let set = resolver(FakeVcs(None)).resolve(dir.path()).await;
        assert!(set.is_empty());
    }

    #[test]
    fn cap_preserves_order_at_or_below_limit() {
        let paths: Vec<PathBuf> = (0..MAX_FILES)
            .rev()
            .map(|i| PathBuf::from(format!("/nonexistent/{i}.js")))
            .collect();
        assert_eq!(cap_by_recency(paths.clone()), paths);
    }

    #[test]
    fn substring_exclusion_is_coarse() {
        let tokens = vec!["test".to_string()];
        assert!(is_excluded(Path::new("/repo/latest_release/a.js"), &tokens, ExclusionMatch::Substring));
        assert!(!is_excluded(Path::new("/repo/latest_release/a.js"), &tokens, ExclusionMatch::Segment));
        assert!(is_excluded(Path::new("/repo/test/a.js"), &tokens, ExclusionMatch::Segment));
    }
}
