//! Diff engine: line diff reduction, git CLI bridge, file reading and
//! project loading.

pub mod file;
pub mod git;
pub mod reducer;
pub mod scanner;

use thiserror::Error;

pub use file::read_text;
pub use git::{GitCli, VersionControl};
pub use reducer::{NEW_FILE_SENTINEL, reduce, reduce_with_context};
pub use scanner::load_files;

/// Errors from the diff engine and its I/O collaborators.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("version control unavailable: {0}")]
    VcsUnavailable(String),

    #[error("path not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
