//! Git CLI bridge for change discovery and committed file contents.
//!
//! Shells out to `git` via `tokio::process::Command`. Every failure maps to
//! [`DiffError::VcsUnavailable`], which callers treat as recoverable.

use std::path::Path;

use async_trait::async_trait;

use super::DiffError;

/// Version-control operations the pipeline depends on.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Paths changed against the last commit, relative to `scope`.
    async fn changed_files(&self, scope: &Path) -> Result<Vec<String>, DiffError>;

    /// The committed (HEAD) content of `path`.
    async fn show_at_head(&self, path: &Path) -> Result<String, DiffError>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

#[async_trait]
impl VersionControl for GitCli {
    async fn changed_files(&self, scope: &Path) -> Result<Vec<String>, DiffError> {
        // NUL-separated output keeps non-ASCII paths unquoted
        let stdout = run_git(scope, &["diff", "--name-only", "-z", "--relative", "HEAD"]).await?;
        Ok(stdout
            .split('\0')
            .filter(|l| !l.is_empty())
            // deleted files have nothing left to review
            .filter(|l| scope.join(l).is_file())
            .map(String::from)
            .collect())
    }

    async fn show_at_head(&self, path: &Path) -> Result<String, DiffError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| DiffError::VcsUnavailable(format!("not a file path: {}", path.display())))?;
        let spec = format!("HEAD:./{}", name.to_string_lossy());
        run_git(dir, &["show", &spec]).await
    }
}

/// Find the root of the git repository containing `start_dir`.
pub async fn find_repo_root(start_dir: &Path) -> Result<String, DiffError> {
    let stdout = run_git(start_dir, &["rev-parse", "--show-toplevel"]).await?;
    Ok(stdout.trim().to_string())
}

/// Run a git subcommand in `dir` and return its stdout.
async fn run_git(dir: &Path, args: &[&str]) -> Result<String, DiffError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| DiffError::VcsUnavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DiffError::VcsUnavailable(format!(
            "git {} failed ({}): {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| DiffError::VcsUnavailable(format!("git output is not valid UTF-8: {e}")))
}
