//! LLM review stage: feeds analyzed files to a [`ReviewProvider`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{ReviewCache, cache_key};
use crate::models::ReportEntry;
use crate::progress::{FileStatus, ProgressTracker};
use crate::prompt::{build_file_prompt, build_system_prompt};
use crate::providers::rig::{INITIAL_BACKOFF, MAX_RETRIES, classify_error, is_retryable, retry_backoff};
use crate::providers::{ProviderError, ReviewProvider};

use super::AnalyzedFile;

/// Reviews analyzed files concurrently, with caching and retries.
pub struct ReviewRunner {
    provider: Arc<dyn ReviewProvider>,
    cache: Arc<ReviewCache>,
    progress: Arc<ProgressTracker>,
    max_concurrent: usize,
    initial_backoff: Duration,
    labels: Arc<dyn Fn(&Path) -> String + Send + Sync>,
}

impl ReviewRunner {
    pub fn new(provider: Arc<dyn ReviewProvider>, cache: ReviewCache, max_concurrent: usize) -> Self {
        Self {
            provider,
            cache: Arc::new(cache),
            progress: Arc::new(ProgressTracker::disabled()),
            max_concurrent: max_concurrent.max(1),
            initial_backoff: INITIAL_BACKOFF,
            labels: Arc::new(|p: &Path| p.display().to_string()),
        }
    }

    /// Report status to `progress`, naming files with `label`.
    pub fn with_progress(
        mut self,
        progress: Arc<ProgressTracker>,
        label: impl Fn(&Path) -> String + Send + Sync + 'static,
    ) -> Self {
        self.progress = progress;
        self.labels = Arc::new(label);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Review every file, returning entries in input order.
    ///
    /// A failed review is recorded on its entry; it never fails the run.
    /// Once `interrupt` is set, files not yet sent are marked interrupted.
    pub async fn review(&self, files: Vec<AnalyzedFile>, interrupt: Arc<AtomicBool>) -> Vec<ReportEntry> {
        let system_prompt = Arc::new(build_system_prompt());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();
        let count = files.len();

        for (idx, file) in files.into_iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let cache = Arc::clone(&self.cache);
            let progress = Arc::clone(&self.progress);
            let sem = Arc::clone(&semaphore);
            let interrupt = Arc::clone(&interrupt);
            let system_prompt = Arc::clone(&system_prompt);
            let initial_backoff = self.initial_backoff;
            let label = (self.labels)(file.bundle.path());

            join_set.spawn(async move {
                let prompt = build_file_prompt(&file.bundle, &file.diff);
                let key = cache_key(&system_prompt, &prompt, provider.model());
                let mut entry = ReportEntry::analysis_only(file.bundle);

                if let Some(cached) = cache.get(&key) {
                    tracing::debug!(file = %label, "review cache hit");
                    progress.update(&label, FileStatus::Done);
                    entry.review = Some(cached);
                    return (idx, entry);
                }

                let Ok(_permit) = sem.acquire().await else {
                    entry.review_error = Some("review cancelled".to_string());
                    return (idx, entry);
                };
                if interrupt.load(Ordering::SeqCst) {
                    progress.update(&label, FileStatus::Skipped("interrupted".to_string()));
                    entry.review_error = Some("review interrupted".to_string());
                    return (idx, entry);
                }
                progress.update(&label, FileStatus::Reviewing);

                match review_with_retry(&*provider, &system_prompt, &prompt, initial_backoff, &progress, &label).await {
                    Ok(review) => {
                        cache.put(&key, provider.model(), &review);
                        progress.update(&label, FileStatus::Done);
                        entry.review = Some(review);
                    }
                    Err(e) => {
                        let short = classify_error(&e)
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string());
                        tracing::warn!(file = %label, error = %e, "review failed");
                        progress.update(&label, FileStatus::Failed(short.clone()));
                        entry.review_error = Some(short);
                    }
                }
                (idx, entry)
            });
        }

        let mut entries: Vec<Option<ReportEntry>> = vec![None; count];
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((idx, entry)) => entries[idx] = Some(entry),
                Err(e) => tracing::warn!(error = %e, "review task panicked"),
            }
        }
        entries.into_iter().flatten().collect()
    }
}

async fn review_with_retry(
    provider: &dyn ReviewProvider,
    system_prompt: &str,
    prompt: &str,
    initial_backoff: Duration,
    progress: &ProgressTracker,
    label: &str,
) -> Result<String, ProviderError> {
    let mut attempt = 0;
    loop {
        match provider.review(system_prompt, prompt).await {
            Ok(review) => return Ok(review),
            Err(ref e) if is_retryable(e) && attempt < MAX_RETRIES => {
                let backoff = retry_backoff(initial_backoff, attempt);
                let reason = classify_error(e).unwrap_or("Transient error").to_string();
                tracing::debug!(file = %label, error = %e, attempt, "retrying review");
                progress.update(
                    label,
                    FileStatus::Retrying {
                        attempt: attempt + 1,
                        max: MAX_RETRIES + 1,
                        reason,
                        backoff_secs: backoff.as_secs(),
                    },
                );
                tokio::time::sleep(backoff).await;
                progress.update(label, FileStatus::Reviewing);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::diff::reduce_with_context;
    use crate::models::{AnalysisBundle, CoverageBasis, CoverageEstimate, DependencyResult};

    /// Replays scripted responses and counts calls.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<Result<String, ProviderError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReviewProvider for ScriptedProvider {
        async fn review(&self, _system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(format!("reviewed {}", prompt.lines().next().unwrap_or(""))))
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    fn file(name: &str, new: &str) -> AnalyzedFile {
        AnalyzedFile {
            bundle: AnalysisBundle::new(
                PathBuf::from(format!("/p/{name}")),
                vec![],
                vec![],
                DependencyResult::default(),
                CoverageEstimate {
                    coverage: 0.0,
                    basis: CoverageBasis::PresenceHeuristic,
                    test_files: vec![],
                    untested: vec![],
                    suggestion: String::new(),
                },
                vec![],
            ),
            diff: reduce_with_context("", new),
        }
    }

    fn runner(provider: Arc<ScriptedProvider>, cache: ReviewCache) -> ReviewRunner {
        ReviewRunner::new(provider, cache, 2).with_initial_backoff(Duration::from_millis(1))
    }

    fn not_interrupted() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn entries_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let files = vec![file("b.js", "b\n"), file("a.js", "a\n"), file("c.js", "c\n")];

        let entries = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(files, not_interrupted())
            .await;

        let paths: Vec<_> = entries.iter().map(|e| e.bundle.path().to_path_buf()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/p/b.js"), PathBuf::from("/p/a.js"), PathBuf::from("/p/c.js")]
        );
        assert_eq!(entries[0].review.as_deref(), Some("reviewed ## Diff for: /p/b.js"));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::ApiError("HTTP 429 Too Many Requests".into())),
            Ok("looks fine".into()),
        ]));

        let entries = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(vec![file("a.js", "a\n")], not_interrupted())
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(entries[0].review.as_deref(), Some("looks fine"));
        assert!(entries[0].review_error.is_none());
    }

    #[tokio::test]
    async fn permanent_errors_are_recorded_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::ApiError(
            "401 Unauthorized".into(),
        ))]));

        let entries = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(vec![file("a.js", "a\n")], not_interrupted())
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(entries[0].review.is_none());
        assert!(entries[0].review_error.as_deref().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn second_run_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("first".into())]));

        let first = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(vec![file("a.js", "a\n")], not_interrupted())
            .await;
        let second = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(vec![file("a.js", "a\n")], not_interrupted())
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first[0].review, second[0].review);
    }

    #[tokio::test]
    async fn interrupt_stops_new_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![]));

        let entries = runner(Arc::clone(&provider), ReviewCache::with_dir(dir.path()))
            .review(vec![file("a.js", "a\n")], Arc::new(AtomicBool::new(true)))
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].review_error.as_deref(), Some("review interrupted"));
    }
}
