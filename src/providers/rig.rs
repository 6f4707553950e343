//! rig-core integration for LLM-backed review narratives.
//!
//! Uses rig-core's provider clients and Agent abstraction for multi-provider
//! support: Anthropic, OpenAI, Gemini, Groq, and any OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers;

use crate::config::ProviderConfig;
use crate::models::ProviderName;

use super::{ProviderError, ReviewProvider};

/// Maximum tokens per LLM completion response.
const MAX_TOKENS: u64 = 8192;

/// Maximum number of retry attempts for transient API errors.
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay between retries.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(10);

/// Maximum backoff delay between retries.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Build a one-shot agent from a rig-core client and prompt it.
///
/// Always sets `max_tokens`; some providers default to a low limit.
macro_rules! prompt_simple {
    ($client:expr, $model:expr, $system:expr, $user:expr, $label:expr) => {{
        let agent = $client
            .agent($model)
            .preamble($system)
            .temperature(0.0)
            .max_tokens(MAX_TOKENS)
            .build();
        agent
            .prompt($user)
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} API error: {e}", $label)))
    }};
}

/// Create a rig-core client using the `Client::new(api_key)` convention.
macro_rules! new_client {
    ($provider_mod:path, $api_key:expr, $label:expr) => {{
        <$provider_mod>::new($api_key).map_err(|e| {
            ProviderError::ApiError(format!("failed to create {} client: {e}", $label))
        })
    }};
}

/// rig-core based review provider.
///
/// The provider name in config selects which rig-core client to use.
pub struct RigProvider {
    config: ProviderConfig,
}

impl RigProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {} or {}.",
                config.name,
                crate::constants::ENV_API_KEY,
                config.name.api_key_env_var()
            )));
        }
        if config.name == ProviderName::OpenAICompatible && config.base_url.is_none() {
            return Err(ProviderError::NotConfigured(
                "openai-compatible provider requires base_url to be set".to_string(),
            ));
        }
        Ok(Self { config })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("missing API key".to_string()))
    }

    fn build_openai_client(
        &self,
        api_key: &str,
    ) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let mut builder = providers::openai::CompletionsClient::builder().api_key(api_key);
        if let Some(ref base_url) = self.config.base_url {
            builder = builder.base_url(base_url);
        }
        builder
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create OpenAI client: {e}")))
    }

    async fn call_rig(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let model = self.config.model.as_str();

        match self.config.name {
            ProviderName::Anthropic => {
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(api_key)
                    .build()
                    .map_err(|e| {
                        ProviderError::ApiError(format!("failed to create Anthropic client: {e}"))
                    })?;
                prompt_simple!(client, model, system_prompt, user_prompt, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.build_openai_client(api_key)?;
                prompt_simple!(client, model, system_prompt, user_prompt, "OpenAI")
            }
            ProviderName::OpenAICompatible => {
                let client = self.build_openai_client(api_key)?;
                prompt_simple!(client, model, system_prompt, user_prompt, "OpenAI-compatible")
            }
            ProviderName::Gemini => {
                let client = new_client!(providers::gemini::Client, api_key, "Gemini")?;
                prompt_simple!(client, model, system_prompt, user_prompt, "Gemini")
            }
            ProviderName::Groq => {
                let client = new_client!(providers::groq::Client, api_key, "Groq")?;
                prompt_simple!(client, model, system_prompt, user_prompt, "Groq")
            }
        }
    }
}

#[async_trait]
impl ReviewProvider for RigProvider {
    async fn review(&self, system_prompt: &str, prompt: &str) -> Result<String, ProviderError> {
        let text = self.call_rig(system_prompt, prompt).await?;
        Ok(text.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Check whether a provider error is transient and worth retrying.
pub fn is_retryable(err: &ProviderError) -> bool {
    classify_error(err).is_some()
}

/// Classifies a provider error into a short, user-friendly message.
///
/// Returns `Some(message)` for transient errors, `None` otherwise.
pub fn classify_error(err: &ProviderError) -> Option<&'static str> {
    let ProviderError::ApiError(msg) = err else {
        return None;
    };
    let msg = msg.to_lowercase();
    if msg.contains("429") || msg.contains("rate limit") || msg.contains("too many requests") {
        Some("Rate limited by API")
    } else if msg.contains("503") || msg.contains("service unavailable") || msg.contains("high demand") {
        Some("High model load")
    } else if msg.contains("529") || msg.contains("overloaded") {
        Some("API overloaded")
    } else if msg.contains("502") {
        Some("API gateway error")
    } else if msg.contains("timeout") || msg.contains("timed out") {
        Some("Request timed out")
    } else if msg.contains("connection") {
        Some("Connection error")
    } else if msg.contains("temporarily") || msg.contains("try again") {
        Some("Temporary API error")
    } else {
        None
    }
}

/// Exponential backoff for retry `attempt` (0-based), capped at
/// [`MAX_BACKOFF`].
pub fn retry_backoff(initial: Duration, attempt: u32) -> Duration {
    initial
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: ProviderName, key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name,
            api_key: key.map(String::from),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn new_provider_missing_api_key() {
        let err = RigProvider::new(config(ProviderName::Anthropic, None))
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"), "got: {err}");
    }

    #[test]
    fn new_provider_with_api_key() {
        let provider = RigProvider::new(config(ProviderName::Anthropic, Some("sk-test"))).unwrap();
        assert_eq!(provider.model(), ProviderConfig::default().model);
    }

    #[test]
    fn openai_compatible_requires_base_url() {
        let result = RigProvider::new(config(ProviderName::OpenAICompatible, Some("k")));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));

        let mut cfg = config(ProviderName::OpenAICompatible, Some("k"));
        cfg.base_url = Some("http://localhost:11434/v1".into());
        assert!(RigProvider::new(cfg).is_ok());
    }

    #[test]
    fn retryable_errors() {
        for msg in ["HTTP 429", "status 503", "Overloaded", "502 Bad Gateway", "request timed out"] {
            assert!(is_retryable(&ProviderError::ApiError(msg.into())), "{msg}");
        }
    }

    #[test]
    fn non_retryable_errors() {
        assert!(!is_retryable(&ProviderError::ApiError("401 Unauthorized".into())));
        assert!(!is_retryable(&ProviderError::NotConfigured("x".into())));
    }

    #[test]
    fn classify_error_messages() {
        assert_eq!(
            classify_error(&ProviderError::ApiError("rate limit exceeded".into())),
            Some("Rate limited by API")
        );
        assert_eq!(
            classify_error(&ProviderError::ApiError("connection reset".into())),
            Some("Connection error")
        );
        assert_eq!(classify_error(&ProviderError::ApiError("bad request".into())), None);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(retry_backoff(INITIAL_BACKOFF, 0), Duration::from_secs(10));
        assert_eq!(retry_backoff(INITIAL_BACKOFF, 1), Duration::from_secs(20));
        assert_eq!(retry_backoff(INITIAL_BACKOFF, 2), Duration::from_secs(40));
        assert_eq!(retry_backoff(INITIAL_BACKOFF, 3), MAX_BACKOFF);
        assert_eq!(retry_backoff(INITIAL_BACKOFF, 30), MAX_BACKOFF);
    }
}
