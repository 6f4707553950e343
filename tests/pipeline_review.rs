//! End-to-end pipeline runs with a mock review provider.
//!
//! Exercises change-set resolution, the analyzers, the review stage and
//! the renderers without making real API calls.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use revlens::analysis::BuiltinLintEngine;
use revlens::cache::ReviewCache;
use revlens::config::Config;
use revlens::diff::{DiffError, VersionControl};
use revlens::models::{ChangeSetSource, LintSeverity, ReviewMode, ReviewReport};
use revlens::output::ReportRenderer;
use revlens::output::json::JsonRenderer;
use revlens::pipeline::{Pipeline, PipelineError, ReviewRunner};
use revlens::providers::{ProviderError, ReviewProvider};

/// A directory that is not under version control.
struct NoVcs;

#[async_trait]
impl VersionControl for NoVcs {
    async fn changed_files(&self, _scope: &Path) -> Result<Vec<String>, DiffError> {
        Err(DiffError::VcsUnavailable("not a git repository".into()))
    }

    async fn show_at_head(&self, _path: &Path) -> Result<String, DiffError> {
        Err(DiffError::VcsUnavailable("not a git repository".into()))
    }
}

/// A mock provider that records prompts and returns a canned review.
struct MockProvider {
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReviewProvider for MockProvider {
    async fn review(&self, _system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Consider guarding against an empty input.".to_string())
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// A provider whose API is always down.
struct FailingProvider;

#[async_trait]
impl ReviewProvider for FailingProvider {
    async fn review(&self, _system_prompt: &str, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::ApiError("401 Unauthorized".into()))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// A small JS project: a utility, a caller and a test for the utility.
fn project() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("__tests__")).unwrap();
    fs::write(
        root.join("src/util.js"),
        "export function total(items) {\n  debugger;\n  return items.reduce((a, b) => a + b, 0);\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("src/app.js"),
        "import { total } from './util';\nconsole.log(total([1, 2]));\n",
    )
    .unwrap();
    fs::write(
        root.join("__tests__/util.test.js"),
        "const { total } = require('../src/util');\ntest('sums', () => expect(total([1])).toBe(1));\n",
    )
    .unwrap();
    (dir, root)
}

fn pipeline(root: &Path) -> Pipeline {
    Pipeline::new(&Config::default(), root, Arc::new(NoVcs), Arc::new(BuiltinLintEngine))
}

fn no_interrupt() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn batch_review_end_to_end() {
    let (_dir, root) = project();
    let cache_dir = tempfile::tempdir().unwrap();
    let p = pipeline(&root);

    let outcome = p.review_batch(&root, no_interrupt()).await.unwrap();
    assert_eq!(outcome.source, ChangeSetSource::Scan);
    assert!(outcome.skipped.is_empty());

    let labels: Vec<String> = outcome.files.iter().map(|f| p.label(f.bundle.path())).collect();
    assert_eq!(labels, vec!["__tests__/util.test.js", "src/app.js", "src/util.js"]);

    let util = &outcome.files[2].bundle;
    assert_eq!(util.lint_count(LintSeverity::Error), 1);
    assert_eq!(util.dependencies().dependents.len(), 2);
    assert!(util.coverage().coverage > 0.0);
    assert_eq!(util.coverage().test_files, vec![root.join("__tests__/util.test.js")]);
    assert_eq!(util.coverage().untested.len(), 1);

    let app = &outcome.files[1].bundle;
    assert_eq!(
        app.dependencies().dependencies.iter().collect::<Vec<_>>(),
        vec![&root.join("src/util.js")]
    );
    assert_eq!(app.coverage().coverage, 0.0);

    let provider = Arc::new(MockProvider::new());
    let entries = ReviewRunner::new(provider.clone(), ReviewCache::with_dir(cache_dir.path()), 2)
        .review(outcome.files, no_interrupt())
        .await;
    assert_eq!(provider.prompts.lock().unwrap().len(), 3);
    assert!(entries.iter().all(|e| e.review.is_some()));

    let report = ReviewReport {
        mode: ReviewMode::Batch,
        source: Some(outcome.source),
        entries,
        skipped: outcome.skipped,
        interrupted: outcome.interrupted,
    };
    let json: serde_json::Value = serde_json::from_str(&JsonRenderer.render(&report)).unwrap();
    assert_eq!(json["summary"]["files"], 3);
    assert_eq!(json["summary"]["lintErrors"], 1);
    assert_eq!(json["report"]["entries"][2]["bundle"]["coverage"]["basis"], "presence-heuristic");
}

#[tokio::test]
async fn prompt_carries_analysis_sections() {
    let (_dir, root) = project();
    let cache_dir = tempfile::tempdir().unwrap();
    let analyzed = pipeline(&root).review_file(&root.join("src/util.js")).await.unwrap();

    let provider = Arc::new(MockProvider::new());
    ReviewRunner::new(provider.clone(), ReviewCache::with_dir(cache_dir.path()), 1)
        .review(vec![analyzed], no_interrupt())
        .await;

    let prompts = provider.prompts.lock().unwrap();
    let prompt = &prompts[0];
    assert!(prompt.contains("+  debugger;"));
    assert!(prompt.contains("(no-debugger)"));
    assert!(prompt.contains("Imported by:"));
    assert!(prompt.contains("not measured"));
    assert!(prompt.contains("util.test.js"));
}

#[tokio::test]
async fn missing_single_file_is_terminal() {
    let (_dir, root) = project();
    let err = pipeline(&root)
        .review_file(&root.join("src/nope.js"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::FileUnreadable { .. }));
}

#[tokio::test]
async fn directory_without_sources_has_no_candidates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), "# notes\n").unwrap();
    let err = pipeline(dir.path())
        .review_batch(dir.path(), no_interrupt())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoCandidates(_)));
    assert!(err.to_string().contains("no reviewable files"));
}

#[tokio::test]
async fn failed_reviews_keep_the_analysis() {
    let (_dir, root) = project();
    let cache_dir = tempfile::tempdir().unwrap();
    let analyzed = pipeline(&root).review_file(&root.join("src/app.js")).await.unwrap();

    let entries = ReviewRunner::new(Arc::new(FailingProvider), ReviewCache::with_dir(cache_dir.path()), 1)
        .with_initial_backoff(Duration::from_millis(1))
        .review(vec![analyzed], no_interrupt())
        .await;

    assert_eq!(entries.len(), 1);
    assert!(entries[0].review.is_none());
    assert!(entries[0].review_error.is_some());
    assert_eq!(entries[0].bundle.lint_count(LintSeverity::Warning), 1);
}
