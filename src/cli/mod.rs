//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

/// Banner with ANSI styling for clap help output.
pub const BANNER_STYLED: &str =
    "\x1b[1mrevlens\x1b[0m \x1b[2m· change analysis and AI-assisted code review\x1b[0m";

/// Print the run banner to stderr.
pub fn print_banner(target: &str) {
    use colored::Colorize;
    use std::io::Write;
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle);
    let _ = writeln!(
        handle,
        "  {} {}",
        "revlens".bold(),
        format!("{} · reviewing {target}", revlens::constants::VERSION).dimmed(),
    );
    let _ = writeln!(handle);
    let _ = handle.flush();
}
