//! Configuration loading and layering.
//!
//! Handles `.revlens.toml` loading, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{
    AnalysisConfig, Config, ConfigError, ExclusionMatch, LintConfig, ProviderConfig, ReviewConfig,
};
