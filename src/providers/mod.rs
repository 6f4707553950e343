//! ReviewProvider trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core so the pipeline never
//! depends on a specific LLM library.

pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the review provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Produces a free-text review for one prompt.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Send `prompt` with `system_prompt` and return the model's review.
    async fn review(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError>;

    /// Model identifier, part of the response cache key.
    fn model(&self) -> &str;
}
