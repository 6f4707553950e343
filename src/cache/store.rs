//! Filesystem-based cache store.
//!
//! Stores each review as a JSON file in the user cache directory
//! (`~/.cache/revlens/reviews/` on Linux).

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::constants::CONFIG_DIR;

/// One cached review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub model: String,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    pub review: String,
}

/// Filesystem-based cache store.
pub struct FileStore {
    cache_dir: Option<PathBuf>,
}

impl FileStore {
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir().map(|d| d.join(CONFIG_DIR).join("reviews"));
        Self { cache_dir }
    }

    pub fn new_with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.key_path(key)?;
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Best effort: write failures are logged and otherwise ignored.
    pub fn put(&self, key: &str, model: &str, review: &str) {
        let Some(path) = self.key_path(key) else {
            return;
        };
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::debug!(dir = %parent.display(), error = %e, "cannot create cache directory");
            return;
        }

        let entry = CacheEntry {
            model: model.to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            review: review.to_string(),
        };
        let result = serde_json::to_string(&entry)
            .map_err(std::io::Error::other)
            .and_then(|content| std::fs::write(&path, content));
        if let Err(e) = result {
            tracing::debug!(path = %path.display(), error = %e, "failed to write cache entry");
        }
    }

    /// Remove all cached entries, returning what was removed.
    pub fn clear(&self) -> Result<CacheStats, std::io::Error> {
        let stats = self.stats()?;
        if let Some(dir) = &self.cache_dir
            && dir.exists()
        {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(stats)
    }

    pub fn stats(&self) -> Result<CacheStats, std::io::Error> {
        let mut stats = CacheStats::default();
        let Some(dir) = &self.cache_dir else {
            return Ok(stats);
        };
        if !dir.exists() {
            return Ok(stats);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                stats.entries += 1;
                stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok(stats)
    }

    pub fn path(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    fn key_path(&self, key: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

impl CacheStats {
    /// Format `total_bytes` as a human-readable string.
    pub fn human_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * KB;

        if self.total_bytes >= MB {
            format!("{:.1} MiB", self.total_bytes as f64 / MB as f64)
        } else if self.total_bytes >= KB {
            format!("{:.1} KiB", self.total_bytes as f64 / KB as f64)
        } else {
            format!("{} B", self.total_bytes)
        }
    }
}
