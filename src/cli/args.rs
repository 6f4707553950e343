//! Clap argument types.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use revlens::models::ReviewReport;
use revlens::output::ReportRenderer;

/// Change analysis and AI-assisted code review.
#[derive(Parser, Debug)]
#[command(
    name = "revlens",
    version = revlens::constants::VERSION,
    about = super::BANNER_STYLED,
)]
pub struct Cli {
    /// Enable debug logging (overridden by REVLENS_LOG).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Review a file, or the changed files of a directory.
    Review(Box<ReviewArgs>),

    /// Manage the review cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print version information.
    Version,
}

/// Cache management subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum CacheAction {
    /// Remove all cached reviews.
    Clear,
    /// Show cache statistics (entry count and size).
    Stats,
    /// Print the cache directory path.
    Path,
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    /// File to review, or directory whose changed files are reviewed.
    pub path: PathBuf,

    // --- Output ---
    /// Output format.
    #[arg(long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Write the rendered report to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Skip the LLM stage and report the analysis only.
    #[arg(long, default_value_t = false)]
    pub analysis_only: bool,

    /// Disable live progress on stderr.
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    // --- Analysis ---
    /// Lint command emitting ESLint-style JSON (`{path}` is replaced).
    #[arg(long)]
    pub lint_command: Option<String>,

    /// Project root for dependency and test lookup
    /// (default: git top level of PATH, else PATH's directory).
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    // --- Performance ---
    /// Max files analysed and reviewed concurrently.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Disable review caching.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
    Markdown,
}

impl OutputFormat {
    /// Render a report using the renderer for this format.
    pub fn render(&self, report: &ReviewReport) -> String {
        match self {
            OutputFormat::Terminal => revlens::output::terminal::TerminalRenderer.render(report),
            OutputFormat::Json => revlens::output::json::JsonRenderer.render(report),
            OutputFormat::Markdown => revlens::output::markdown::MarkdownRenderer.render(report),
        }
    }
}
