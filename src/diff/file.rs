//! Single-file text reader.

use std::path::Path;

use super::DiffError;

/// Read a file as UTF-8 text.
pub async fn read_text(path: &Path) -> Result<String, DiffError> {
    if !path.exists() {
        return Err(DiffError::NotFound(path.display().to_string()));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DiffError::Unreadable {
            path: path.display().to_string(),
            source,
        })
}
