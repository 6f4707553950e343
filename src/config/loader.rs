//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.revlens.toml` in the project root
//! 4. `~/.config/revlens/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants;
use crate::env::Env;
use crate::models::ProviderName;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub lint: LintConfig,
    pub review: ReviewConfig,
    pub provider: ProviderConfig,
}

/// How exclusion tokens are matched against candidate paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionMatch {
    /// Token anywhere in the full path string (`build` also drops `rebuild.js`).
    #[default]
    Substring,
    /// Token must equal a whole path component.
    Segment,
}

/// Settings shared by change-set resolution and the analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Reviewable file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Path tokens that exclude a candidate from the recursive scan.
    pub exclude: Vec<String>,
    pub exclusion_match: ExclusionMatch,
    /// Conventional test directories searched under the project root.
    pub test_dirs: Vec<String>,
    /// Coverage reported when at least one candidate test file exists.
    pub presumed_coverage: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extensions: ["js", "jsx", "ts", "tsx", "mjs", "cjs", "py", "rs", "go", "java", "rb"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: ["node_modules", ".git", "dist", "build", "coverage", "target"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclusion_match: ExclusionMatch::Substring,
            test_dirs: ["__tests__", "tests", "test", "spec"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            presumed_coverage: 0.5,
        }
    }
}

impl AnalysisConfig {
    /// Whether `ext` (with or without a leading dot, any case) is allowed.
    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// External lint engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Shell command emitting ESLint-style JSON. `{path}` is replaced with
    /// the file path; the source is piped on stdin.
    pub command: Option<String>,
}

/// Review-stage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Files analysed concurrently in batch mode.
    pub max_concurrent: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { max_concurrent: 1 }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, project-local config, then applies
    /// environment variable overrides.
    pub fn load(project_root: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        if let Some(root) = project_root {
            let local_path = root.join(constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other wins for non-default values).
    fn merge(&mut self, other: Config) {
        let default_analysis = AnalysisConfig::default();
        if other.analysis.extensions != default_analysis.extensions {
            self.analysis.extensions = other.analysis.extensions;
        }
        if other.analysis.exclude != default_analysis.exclude {
            self.analysis.exclude = other.analysis.exclude;
        }
        if other.analysis.exclusion_match != default_analysis.exclusion_match {
            self.analysis.exclusion_match = other.analysis.exclusion_match;
        }
        if other.analysis.test_dirs != default_analysis.test_dirs {
            self.analysis.test_dirs = other.analysis.test_dirs;
        }
        if other.analysis.presumed_coverage != default_analysis.presumed_coverage {
            self.analysis.presumed_coverage = other.analysis.presumed_coverage.clamp(0.0, 1.0);
        }

        if other.lint.command.is_some() {
            self.lint.command = other.lint.command;
        }

        if other.review.max_concurrent != ReviewConfig::default().max_concurrent {
            self.review.max_concurrent = other.review.max_concurrent;
        }

        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if other.provider.api_key.is_some() {
            self.provider.api_key = other.provider.api_key;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.non_empty(constants::ENV_PROVIDER) {
            match val.parse::<ProviderName>() {
                Ok(name) => self.provider.name = name,
                Err(_) => tracing::warn!(
                    var = constants::ENV_PROVIDER,
                    value = %val,
                    "ignoring invalid provider override"
                ),
            }
        }
        if let Some(val) = env.non_empty(constants::ENV_MODEL) {
            self.provider.model = val;
        }
        if let Some(val) = env.non_empty(constants::ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }
        if let Some(val) = env.non_empty(constants::ENV_LINT_COMMAND) {
            self.lint.command = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env.first(&[constants::ENV_API_KEY, self.provider.name.api_key_env_var()]);
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_env() -> Env {
        Env::mock(Vec::<(&str, &str)>::new())
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.analysis.exclusion_match, ExclusionMatch::Substring);
        assert_eq!(
            config.analysis.test_dirs,
            vec!["__tests__", "tests", "test", "spec"]
        );
        assert_eq!(config.review.max_concurrent, 1);
        assert!(config.lint.command.is_none());
    }

    #[test]
    fn allows_extension_is_case_insensitive() {
        let config = AnalysisConfig::default();
        assert!(config.allows_extension("JS"));
        assert!(config.allows_extension(".tsx"));
        assert!(!config.allows_extension("md"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[analysis]
extensions = ["py"]
exclude = ["venv"]
exclusion_match = "segment"
presumed_coverage = 0.7

[lint]
command = "ruff check --output-format json -"

[review]
max_concurrent = 4

[provider]
name = "openai"
model = "gpt-4o"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.analysis.extensions, vec!["py"]);
        assert_eq!(config.analysis.exclusion_match, ExclusionMatch::Segment);
        assert_eq!(config.analysis.presumed_coverage, 0.7);
        assert_eq!(config.review.max_concurrent, 4);
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert!(config.lint.command.is_some());
        // Unspecified fields keep their defaults
        assert_eq!(config.analysis.test_dirs.len(), 4);
    }

    #[test]
    fn merge_overrides_non_default_values() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.analysis.exclude = vec!["vendor".to_string()];
        other.analysis.exclusion_match = ExclusionMatch::Segment;
        other.analysis.presumed_coverage = 3.0;
        other.lint.command = Some("eslint --stdin".to_string());
        other.provider.model = "gpt-4o".to_string();
        other.provider.api_key = Some("sk-test".to_string());

        base.merge(other);

        assert_eq!(base.analysis.exclude, vec!["vendor"]);
        assert_eq!(base.analysis.exclusion_match, ExclusionMatch::Segment);
        assert_eq!(base.analysis.presumed_coverage, 1.0);
        assert_eq!(base.lint.command.as_deref(), Some("eslint --stdin"));
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.provider.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn merge_keeps_base_when_other_is_default() {
        let mut base = Config::default();
        base.analysis.extensions = vec!["rs".to_string()];
        base.review.max_concurrent = 3;

        base.merge(Config::default());

        assert_eq!(base.analysis.extensions, vec!["rs"]);
        assert_eq!(base.review.max_concurrent, 3);
    }

    #[test]
    fn load_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{ toml").unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn load_file_not_found() {
        let err = Config::load_file(Path::new("/tmp/revlens_not_exist_config.toml")).unwrap_err();
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn load_from_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".revlens.toml"),
            "[analysis]\nexclude = [\"fixtures\"]\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &no_env()).unwrap();
        assert_eq!(config.analysis.exclude, vec!["fixtures"]);
    }

    #[test]
    fn apply_env_vars_provider_and_api_key() {
        let env = Env::mock([
            ("REVLENS_PROVIDER", "openai"),
            ("REVLENS_API_KEY", "sk-env-test"),
            ("REVLENS_LINT_COMMAND", "eslint --format json --stdin"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-env-test"));
        assert_eq!(
            config.lint.command.as_deref(),
            Some("eslint --format json --stdin")
        );
    }

    #[test]
    fn apply_env_vars_invalid_provider_falls_back() {
        let env = Env::mock([("REVLENS_PROVIDER", "not-a-provider")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::Anthropic);
    }

    #[test]
    fn apply_env_vars_provider_specific_api_key_fallback() {
        let env = Env::mock([("ANTHROPIC_API_KEY", "sk-anthropic-test")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-anthropic-test"));
    }

    #[test]
    fn provider_debug_redacts_api_key() {
        let mut provider = ProviderConfig::default();
        provider.api_key = Some("sk-secret".to_string());
        let debug = format!("{provider:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
