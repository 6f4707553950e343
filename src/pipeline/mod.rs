//! Analysis pipeline: per-file analysis plus single and batch orchestration.
//!
//! Every analyzer recovers locally, so building a bundle never fails for a
//! readable file. Only an unreadable single-file target and an empty change
//! set are terminal.

pub mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::analysis::{
    CachingGraphBuilder, CoverageEstimator, DependencyGraph, DependencyResolver, ImportGraphBuilder,
    LintEngine, SourceFilter, StaticAnalyzer, suggest,
};
use crate::changeset::ChangeSetResolver;
use crate::config::Config;
use crate::diff::{self, DiffError, NEW_FILE_SENTINEL, VersionControl};
use crate::models::{
    AnalysisBundle, ChangeRecord, ChangeSetSource, FileRecord, SkippedFile,
};
use crate::progress::{FileStatus, ProgressTracker};

pub use runner::ReviewRunner;

/// Terminal pipeline failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot review {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: DiffError,
    },

    #[error("no reviewable files found in {0}")]
    NoCandidates(PathBuf),
}

/// One analyzed file: its bundle plus the diff with unchanged context,
/// which the prompt builder renders.
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub bundle: AnalysisBundle,
    pub diff: Vec<ChangeRecord>,
}

/// Result of a batch run, files in discovery order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub source: ChangeSetSource,
    pub files: Vec<AnalyzedFile>,
    pub skipped: Vec<SkippedFile>,
    pub interrupted: bool,
}

/// Runs the analyzers over single files and change sets.
#[derive(Clone)]
pub struct Pipeline {
    project_root: PathBuf,
    max_concurrent: usize,
    vcs: Arc<dyn VersionControl>,
    lint: StaticAnalyzer,
    deps: DependencyResolver,
    coverage: CoverageEstimator,
    changeset: ChangeSetResolver,
    progress: Arc<ProgressTracker>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        project_root: impl Into<PathBuf>,
        vcs: Arc<dyn VersionControl>,
        lint_engine: Arc<dyn LintEngine>,
    ) -> Self {
        let project_root = project_root.into();
        let filter = SourceFilter::from_config(&config.analysis);
        let graph_builder = CachingGraphBuilder::new(ImportGraphBuilder::new(filter.clone()), filter);

        Self {
            max_concurrent: config.review.max_concurrent.max(1),
            vcs: Arc::clone(&vcs),
            lint: StaticAnalyzer::new(lint_engine),
            deps: DependencyResolver::new(Arc::new(graph_builder)),
            coverage: CoverageEstimator::new(&project_root, &config.analysis),
            changeset: ChangeSetResolver::new(config.analysis.clone(), vcs),
            progress: Arc::new(ProgressTracker::disabled()),
            project_root,
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Run all analyzers over one file.
    pub async fn analyze(
        &self,
        record: &FileRecord,
        old_text: &str,
        graph: &DependencyGraph,
    ) -> AnalyzedFile {
        let changes = diff::reduce(old_text, &record.content);
        let lint_issues = self.lint.analyze(&record.content, &record.path).await;
        let dependencies = DependencyResolver::lookup(graph, &record.path);
        let coverage = self.coverage.estimate(&record.path, &changes).await;
        let edge_cases = suggest(&record.content);

        AnalyzedFile {
            diff: diff::reduce_with_context(old_text, &record.content),
            bundle: AnalysisBundle::new(
                record.path.clone(),
                changes,
                lint_issues,
                dependencies,
                coverage,
                edge_cases,
            ),
        }
    }

    /// Analyze a single file. An unreadable target is terminal.
    pub async fn review_file(&self, path: &Path) -> Result<AnalyzedFile, PipelineError> {
        let record = self.load(path).await.map_err(|source| PipelineError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let label = self.label(&record.path);
        self.progress.update(&label, FileStatus::Analyzing);

        let graph = self.graph().await;
        let old_text = self.old_text(&record.path).await;
        let analyzed = self.analyze(&record, &old_text, &graph).await;
        self.progress.update(&label, FileStatus::Done);
        Ok(analyzed)
    }

    /// Resolve the change set for `dir` and analyze each file.
    ///
    /// Unreadable files are skipped. Once `interrupt` is set no new file is
    /// started; finished bundles are kept.
    pub async fn review_batch(
        &self,
        dir: &Path,
        interrupt: Arc<AtomicBool>,
    ) -> Result<BatchOutcome, PipelineError> {
        let change_set = self.changeset.resolve(dir).await;
        if change_set.is_empty() {
            return Err(PipelineError::NoCandidates(dir.to_path_buf()));
        }
        let paths = change_set.paths().to_vec();
        for path in &paths {
            self.progress.update(&self.label(path), FileStatus::Pending);
        }

        let graph = Arc::new(self.graph().await);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();

        for (idx, path) in paths.iter().enumerate() {
            if interrupt.load(Ordering::SeqCst) {
                break;
            }
            let pipeline = self.clone();
            let graph = Arc::clone(&graph);
            let sem = Arc::clone(&semaphore);
            let interrupt = Arc::clone(&interrupt);
            let path = path.clone();

            join_set.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return (idx, FileOutcome::NotStarted);
                };
                if interrupt.load(Ordering::SeqCst) {
                    return (idx, FileOutcome::NotStarted);
                }
                (idx, pipeline.analyze_batch_file(&path, &graph).await)
            });
        }

        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; paths.len()];
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "analysis task failed"),
            }
        }

        let interrupted = interrupt.load(Ordering::SeqCst);
        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for (path, outcome) in paths.into_iter().zip(outcomes) {
            let reason = match outcome {
                Some(FileOutcome::Analyzed(analyzed)) => {
                    files.push(*analyzed);
                    continue;
                }
                Some(FileOutcome::Skipped(reason)) => reason,
                Some(FileOutcome::NotStarted) => "not analyzed: interrupted".to_string(),
                None if interrupted => "not analyzed: interrupted".to_string(),
                None => "analysis task failed".to_string(),
            };
            self.progress.update(&self.label(&path), FileStatus::Skipped(reason.clone()));
            skipped.push(SkippedFile { path, reason });
        }

        Ok(BatchOutcome {
            source: change_set.source(),
            files,
            skipped,
            interrupted,
        })
    }

    async fn analyze_batch_file(&self, path: &Path, graph: &DependencyGraph) -> FileOutcome {
        let label = self.label(path);
        self.progress.update(&label, FileStatus::Analyzing);

        let record = match self.load(path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                return FileOutcome::Skipped(e.to_string());
            }
        };
        let old_text = self.old_text(&record.path).await;
        let analyzed = self.analyze(&record, &old_text, graph).await;
        self.progress.update(&label, FileStatus::Done);
        FileOutcome::Analyzed(Box::new(analyzed))
    }

    async fn load(&self, path: &Path) -> Result<FileRecord, DiffError> {
        let content = diff::read_text(path).await?;
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(FileRecord::new(path, content))
    }

    /// The committed version of `path`, or the new-file sentinel.
    async fn old_text(&self, path: &Path) -> String {
        match self.vcs.show_at_head(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "no committed version, treating as new file");
                NEW_FILE_SENTINEL.to_string()
            }
        }
    }

    /// The project graph, or an empty one if it cannot be built.
    async fn graph(&self) -> DependencyGraph {
        match self.deps.graph(&self.project_root).await {
            Ok(graph) => Arc::unwrap_or_clone(graph),
            Err(e) => {
                tracing::warn!(root = %self.project_root.display(), error = %e, "dependency graph unavailable");
                DependencyGraph::default()
            }
        }
    }

    /// Display label for progress lines, relative to the project root.
    pub fn label(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[derive(Clone)]
enum FileOutcome {
    Analyzed(Box<AnalyzedFile>),
    Skipped(String),
    NotStarted,
}
