//! revlens: change analysis and AI-assisted code review CLI.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use revlens::analysis;
use revlens::cache;
use revlens::config;
use revlens::constants;
use revlens::diff;
use revlens::env;
use revlens::models;
use revlens::pipeline;
use revlens::progress;
use revlens::providers;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::args::{CacheAction, Cli, Command, OutputFormat, ReviewArgs};
use config::Config;
use env::Env;
use models::{ReportEntry, ReviewMode, ReviewReport};
use pipeline::{Pipeline, ReviewRunner};
use progress::ProgressTracker;
use providers::ReviewProvider;
use providers::rig::RigProvider;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Review(args) => run_review(*args).await,
        Command::Cache { action } => run_cache(action).await,
        Command::Version => run_version(),
    }
}

/// `REVLENS_LOG` wins; otherwise `--verbose` means debug, else warnings only.
fn init_tracing(verbose: bool) {
    let filter = std::env::var(constants::ENV_LOG)
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_version() -> Result<()> {
    use colored::Colorize;

    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    Ok(())
}

/// Manage the review cache.
async fn run_cache(action: CacheAction) -> Result<()> {
    let cache = cache::ReviewCache::new(true);

    match action {
        CacheAction::Clear => {
            let stats = cache.clear().context("failed to clear cache")?;
            println!(
                "Cleared {} cached review(s) ({}).",
                stats.entries,
                stats.human_size(),
            );
        }
        CacheAction::Stats => {
            let stats = cache.stats().context("failed to read cache stats")?;
            println!("Cache entries: {}", stats.entries);
            println!("Cache size:    {}", stats.human_size());
        }
        CacheAction::Path => match cache.path() {
            Some(p) => println!("{}", p.display()),
            None => bail!("cache directory could not be determined"),
        },
    }

    Ok(())
}

/// Project root: the flag, else the git top level, else the target's directory.
async fn resolve_project_root(args: &ReviewArgs) -> Result<PathBuf> {
    if let Some(ref root) = args.project_root {
        return std::fs::canonicalize(root)
            .with_context(|| format!("--project-root directory not found: {}", root.display()));
    }

    let dir = if args.path.is_dir() {
        args.path.clone()
    } else {
        match args.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    };
    let dir = std::fs::canonicalize(&dir).unwrap_or(dir);

    match diff::git::find_repo_root(&dir).await {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "not in a git repository");
            Ok(dir)
        }
    }
}

async fn run_review(args: ReviewArgs) -> Result<()> {
    let project_root = resolve_project_root(&args).await?;

    let mut config = Config::load(Some(&project_root), &Env::real())
        .context("failed to load configuration")?;
    if let Some(ref cmd) = args.lint_command {
        config.lint.command = Some(cmd.clone());
    }
    if let Some(n) = args.max_concurrent {
        config.review.max_concurrent = n.max(1);
    }

    // Fail on provider misconfiguration before doing any work.
    let provider: Option<Arc<dyn ReviewProvider>> = if args.analysis_only {
        None
    } else {
        Some(Arc::new(
            RigProvider::new(config.provider.clone()).context("LLM provider is not configured")?,
        ))
    };

    let show_progress =
        !args.no_progress && args.format == OutputFormat::Terminal && std::io::stderr().is_terminal();
    let progress = Arc::new(ProgressTracker::new(&[], show_progress));
    if show_progress {
        cli::print_banner(&args.path.display().to_string());
    }
    progress.start(&format!("Analyzing {}", args.path.display()));

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = Arc::clone(&interrupt);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.store(true, Ordering::SeqCst);
                tracing::warn!("interrupt received, finishing in-flight files");
            }
        });
    }

    let pipeline = Pipeline::new(
        &config,
        &project_root,
        Arc::new(diff::GitCli),
        analysis::engine_from_config(&config.lint),
    )
    .with_progress(Arc::clone(&progress));

    let (mode, source, files, skipped, mut interrupted) = if args.path.is_dir() {
        let outcome = pipeline.review_batch(&args.path, Arc::clone(&interrupt)).await?;
        for s in &outcome.skipped {
            tracing::warn!(file = %s.path.display(), reason = %s.reason, "file skipped");
        }
        (
            ReviewMode::Batch,
            Some(outcome.source),
            outcome.files,
            outcome.skipped,
            outcome.interrupted,
        )
    } else {
        let analyzed = pipeline.review_file(&args.path).await?;
        (ReviewMode::Single, None, vec![analyzed], Vec::new(), false)
    };

    let entries = match provider {
        None => files
            .into_iter()
            .map(|f| ReportEntry::analysis_only(f.bundle))
            .collect(),
        Some(provider) => {
            let labeler = pipeline.clone();
            ReviewRunner::new(
                provider,
                cache::ReviewCache::new(!args.no_cache),
                config.review.max_concurrent,
            )
            .with_progress(Arc::clone(&progress), move |p: &Path| labeler.label(p))
            .review(files, Arc::clone(&interrupt))
            .await
        }
    };
    interrupted |= interrupt.load(Ordering::SeqCst);
    progress.finish();

    let report = ReviewReport {
        mode,
        source,
        entries,
        skipped,
        interrupted,
    };
    let rendered = args.format.render(&report);

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    if !args.analysis_only
        && !report.entries.is_empty()
        && report.entries.iter().all(|e| e.review.is_none())
    {
        bail!("all {} review(s) failed", report.entries.len());
    }

    Ok(())
}
