//! Shared types used across all modules.
//!
//! This module defines the core data structures for source files, change
//! records, analyzer results, and review reports. Other modules import from
//! here rather than reaching into each other's internals.

pub mod analysis;
pub mod diff;
pub mod lint;
pub mod report;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use analysis::{AnalysisBundle, CoverageBasis, CoverageEstimate, DependencyResult, EdgeCaseList};
pub use diff::{ChangeKind, ChangeRecord, LineRange};
pub use lint::{LintIssue, LintSeverity};
pub use report::{ReportEntry, ReviewMode, ReviewReport, SkippedFile, Summary};

use crate::constants::MAX_FILES;

/// A source file loaded for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Full text content.
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Where the files of a change set were discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChangeSetSource {
    /// Reported as changed by the version-control system.
    VersionControl,
    /// Found by the recursive filesystem scan fallback.
    Scan,
}

/// The ordered list of files selected for a batch review.
///
/// Never holds more than [`MAX_FILES`] paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    paths: Vec<PathBuf>,
    source: ChangeSetSource,
}

impl ChangeSet {
    /// Build a change set, truncating to [`MAX_FILES`] if needed.
    pub(crate) fn new(mut paths: Vec<PathBuf>, source: ChangeSetSource) -> Self {
        paths.truncate(MAX_FILES);
        Self { paths, source }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn source(&self) -> ChangeSetSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Supported LLM provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
    Groq,
    /// Any OpenAI-compatible API (e.g. Ollama, local servers).
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderName::Anthropic => write!(f, "anthropic"),
            ProviderName::OpenAI => write!(f, "openai"),
            ProviderName::Gemini => write!(f, "gemini"),
            ProviderName::Groq => write!(f, "groq"),
            ProviderName::OpenAICompatible => write!(f, "openai-compatible"),
        }
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderName::Anthropic),
            "openai" => Ok(ProviderName::OpenAI),
            "gemini" => Ok(ProviderName::Gemini),
            "groq" => Ok(ProviderName::Groq),
            "openai-compatible" => Ok(ProviderName::OpenAICompatible),
            other => Err(format!(
                "unsupported provider: '{other}'. Supported: anthropic, openai, gemini, groq, openai-compatible"
            )),
        }
    }
}

impl ProviderName {
    /// Returns the provider-specific environment variable name for the API key.
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            ProviderName::Anthropic => "ANTHROPIC_API_KEY",
            ProviderName::OpenAI | ProviderName::OpenAICompatible => "OPENAI_API_KEY",
            ProviderName::Gemini => "GEMINI_API_KEY",
            ProviderName::Groq => "GROQ_API_KEY",
        }
    }
}
