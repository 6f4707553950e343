//! revlens: change analysis pipeline and AI-assisted code review (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod analysis;
pub mod cache;
pub mod changeset;
pub mod config;
pub mod constants;
pub mod diff;
pub mod env;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod providers;
