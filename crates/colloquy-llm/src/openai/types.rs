//! Wire types and configuration for the chat-completions API.

use std::time::Duration;

use colloquy_core::{ChatMessage, TokenUsage};
use serde::{Deserialize, Serialize};

use crate::provider::RequestError;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Reply text used when the service returns no message content.
pub const NO_RESPONSE_CONTENT: &str = "NO RESPONSE FOUND";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Provider configuration.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Bearer API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL (no trailing slash).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Configuration with the default base URL and a two-minute timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Read the API key from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, RequestError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(Self::new(key, model)),
            _ => Err(RequestError::Auth {
                message: format!("missing {API_KEY_ENV}"),
            }),
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `POST /chat/completions` body.
#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Ordered conversation.
    pub messages: &'a [ChatMessage],
}

/// `POST /chat/completions` response (fields we use).
#[derive(Clone, Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices; the first one is used.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token usage.
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

/// One generated choice.
#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    /// The generated message.
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

/// Message inside a choice.
#[derive(Clone, Debug, Deserialize)]
pub struct ChoiceMessage {
    /// Reply text (absent for e.g. function calls).
    #[serde(default)]
    pub content: Option<String>,
}

/// Usage block as reported by the API.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ApiUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: u32,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        Self::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

impl ChatCompletionResponse {
    /// Text of the first choice, or [`NO_RESPONSE_CONTENT`].
    #[must_use]
    pub fn content(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_RESPONSE_CONTENT.to_string())
    }
}
