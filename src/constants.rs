//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and fixed pipeline limits so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "revlens";

/// Crate version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.revlens.toml` in the project root).
pub const CONFIG_FILENAME: &str = ".revlens.toml";

/// Directory name under `~/.config/` for global config and cache.
pub const CONFIG_DIR: &str = "revlens";

/// Maximum number of files selected for a single batch review.
pub const MAX_FILES: usize = 10;

/// Disclosure appended to rendered reports that include LLM narrative.
pub const AI_DISCLOSURE: &str = "Review narrative generated by an LLM; verify before acting on it.";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "REVLENS_PROVIDER";
pub const ENV_MODEL: &str = "REVLENS_MODEL";
pub const ENV_API_KEY: &str = "REVLENS_API_KEY";
pub const ENV_BASE_URL: &str = "REVLENS_BASE_URL";
pub const ENV_LINT_COMMAND: &str = "REVLENS_LINT_COMMAND";
pub const ENV_LOG: &str = "REVLENS_LOG";
