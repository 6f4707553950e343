//! Content-hash based review cache.
//!
//! Skips redundant LLM calls when the exact same prompt is sent to the same
//! model again.

pub mod store;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub use store::CacheStats;

/// Compute a cache key from the full prompt pair and model name.
pub fn cache_key(system_prompt: &str, prompt: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [system_prompt, prompt, model] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Review narrative cache.
pub struct ReviewCache {
    enabled: bool,
    store: store::FileStore,
}

impl ReviewCache {
    /// Cache in the user's default cache directory.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            store: store::FileStore::new(),
        }
    }

    /// Cache rooted at `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            store: store::FileStore::new_with_dir(dir.into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.store.get(key).map(|entry| entry.review)
    }

    pub fn put(&self, key: &str, model: &str, review: &str) {
        if !self.enabled {
            return;
        }
        self.store.put(key, model, review);
    }

    /// Remove all cached entries.
    pub fn clear(&self) -> Result<CacheStats, std::io::Error> {
        self.store.clear()
    }

    pub fn stats(&self) -> Result<CacheStats, std::io::Error> {
        self.store.stats()
    }

    /// The cache directory, if one could be determined.
    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }
}
