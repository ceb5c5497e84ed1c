//! `OpenAI` provider implementing [`CompletionProvider`].
//!
//! Sends non-streaming `POST {base_url}/chat/completions` requests with a
//! bearer API key and maps HTTP failures onto [`RequestError`]:
//!
//! | Status | Error |
//! |--------|-------|
//! | 401, 403 | `Auth` |
//! | 429 | `RateLimited` (with `retry-after` when sent) |
//! | other non-2xx | `Api` (retryable for 5xx) |

use async_trait::async_trait;
use colloquy_core::ChatMessage;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use tracing::{debug, info};

use crate::openai::types::{ChatCompletionRequest, ChatCompletionResponse, OpenAiConfig};
use crate::provider::{Completion, CompletionProvider, RateLimits, RequestError, RequestResult};

/// Chat-completions client.
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider from configuration.
    pub fn new(config: OpenAiConfig) -> RequestResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        info!(model = %config.model, base_url = %config.base_url, "OpenAI provider initialized");
        Ok(Self { config, client })
    }

    fn build_headers(&self) -> RequestResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| RequestError::Auth {
                message: format!("Invalid authorization header: {e}"),
            })?,
        );
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Parse an API error response body into `(message, code)`.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["code"]
            .as_str()
            .or_else(|| error["type"].as_str())
            .map(String::from);
        (message, code)
    } else {
        (format!("HTTP {status}: {body}"), None)
    }
}

/// Map a non-success status to a [`RequestError`].
fn classify_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> RequestError {
    let (message, code) = parse_api_error(body, status);
    match status {
        401 | 403 => RequestError::Auth { message },
        429 => RequestError::RateLimited {
            retry_after_ms: retry_after_secs.map(|s| s.saturating_mul(1000)),
            message,
        },
        _ => RequestError::Api {
            status,
            message,
            code,
            retryable: status >= 500,
        },
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> RequestResult<Completion> {
        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            "requesting chat completion"
        );

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
        };
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let rate_limits = RateLimits::from_headers(response.headers());

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body, retry_after));
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;

        let completion = Completion {
            content: parsed.content(),
            usage: parsed.usage.map(Into::into),
            rate_limits,
        };
        debug!(
            content_len = completion.content.len(),
            has_usage = completion.usage.is_some(),
            "chat completion received"
        );
        Ok(completion)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
