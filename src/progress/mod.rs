//! Progress reporting for terminal output.
//!
//! Live per-file status on stderr, listed in discovery order. Designed for
//! interactive terminals; silenced with `--no-progress` or when the output
//! format is not `terminal`.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use colored::Colorize;
use indexmap::IndexMap;

/// Status of one file in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    Analyzing,
    Reviewing,
    Retrying {
        attempt: u32,
        max: u32,
        reason: String,
        backoff_secs: u64,
    },
    Done,
    Skipped(String),
    Failed(String),
}

/// Tracks and renders live progress.
///
/// Shared across tasks via `Arc`.
pub struct ProgressTracker {
    inner: Mutex<ProgressState>,
    enabled: bool,
}

struct ProgressState {
    files: IndexMap<String, FileStatus>,
    rendered_lines: usize,
    header: String,
}

impl ProgressTracker {
    pub fn new(files: &[String], enabled: bool) -> Self {
        Self {
            inner: Mutex::new(ProgressState {
                files: files
                    .iter()
                    .map(|f| (f.clone(), FileStatus::Pending))
                    .collect(),
                rendered_lines: 0,
                header: String::new(),
            }),
            enabled,
        }
    }

    /// A tracker that never prints.
    pub fn disabled() -> Self {
        Self::new(&[], false)
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Print the header and the initial file listing.
    pub fn start(&self, header: &str) {
        let mut state = self.state();
        state.header = header.to_string();
        if self.enabled {
            Self::render(&mut state);
        }
    }

    /// Set a file's status and re-render. Unknown files are appended.
    pub fn update(&self, file: &str, status: FileStatus) {
        let mut state = self.state();
        state.files.insert(file.to_string(), status);
        if self.enabled {
            Self::render(&mut state);
        }
    }

    pub fn status(&self, file: &str) -> Option<FileStatus> {
        self.state().files.get(file).cloned()
    }

    /// Replace the live display with a final per-file listing.
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.state();
        Self::clear_lines(state.rendered_lines);
        state.rendered_lines = 0;

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for (file, status) in &state.files {
            let (icon, text) = Self::describe(status);
            let _ = writeln!(handle, "  {icon} {} {text}", file.dimmed());
        }
        let _ = writeln!(handle);
    }

    fn describe(status: &FileStatus) -> (String, String) {
        match status {
            FileStatus::Pending => ("○".dimmed().to_string(), "waiting".dimmed().to_string()),
            FileStatus::Analyzing => (
                "◌".cyan().bold().to_string(),
                "analyzing…".cyan().to_string(),
            ),
            FileStatus::Reviewing => (
                "◌".cyan().bold().to_string(),
                "reviewing…".cyan().to_string(),
            ),
            FileStatus::Retrying {
                attempt,
                max,
                reason,
                backoff_secs,
            } => (
                "⟳".yellow().bold().to_string(),
                format!("{reason}, retrying in {backoff_secs}s ({attempt}/{max})")
                    .yellow()
                    .to_string(),
            ),
            FileStatus::Done => ("✔".green().bold().to_string(), "done".green().to_string()),
            FileStatus::Skipped(reason) => (
                "–".yellow().bold().to_string(),
                format!("skipped: {reason}").yellow().to_string(),
            ),
            FileStatus::Failed(reason) => ("✖".red().bold().to_string(), reason.red().to_string()),
        }
    }

    fn render(state: &mut ProgressState) {
        Self::clear_lines(state.rendered_lines);

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        let mut lines = 0;

        if !state.header.is_empty() {
            let _ = writeln!(handle, "  {} {}", "▸".cyan().bold(), state.header);
            lines += 1;
        }
        for (file, status) in &state.files {
            let (icon, text) = Self::describe(status);
            let _ = writeln!(handle, "    {icon} {} {text}", file.dimmed());
            lines += 1;
        }

        let _ = handle.flush();
        state.rendered_lines = lines;
    }

    /// Move the cursor up and clear `n` lines.
    fn clear_lines(n: usize) {
        if n == 0 {
            return;
        }
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for _ in 0..n {
            let _ = write!(handle, "\x1b[1A\x1b[2K");
        }
        let _ = handle.flush();
    }
}
