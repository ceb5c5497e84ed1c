//! # Completion boundary
//!
//! Core abstraction over the completion service. The conversation core only
//! ever sees [`CompletionProvider::complete`]: an ordered list of
//! `{role, content}` pairs in, reply text plus reported usage out.
//!
//! Timeouts belong to the implementation; callers treat every failure
//! uniformly as a [`RequestError`].

use async_trait::async_trait;
use colloquy_core::{ChatMessage, TokenUsage};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Result type alias for completion requests.
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors that can occur while requesting a completion.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed or credentials are missing.
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Rate limited by the service.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Suggested retry delay in milliseconds, when the service sent one.
        retry_after_ms: Option<u64>,
        /// Error description.
        message: String,
    },

    /// Service returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Service-specific error code.
        code: Option<String>,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl RequestError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Auth { .. } | Self::Json(_) | Self::Other { .. } => false,
        }
    }

    /// Error category string for display.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }
}

/// Rate-limit state reported in `x-ratelimit-*` response headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimits {
    /// Request quota per window.
    pub requests_limit: Option<u64>,
    /// Requests left in the current window.
    pub requests_remaining: Option<u64>,
    /// Time until the request window resets (e.g. `"1s"`).
    pub requests_reset: Option<String>,
    /// Token quota per window.
    pub tokens_limit: Option<u64>,
    /// Tokens left in the current window.
    pub tokens_remaining: Option<u64>,
    /// Time until the token window resets (e.g. `"6m0s"`).
    pub tokens_reset: Option<String>,
}

impl RateLimits {
    /// Read rate-limit headers. Returns `None` if none are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let number = |name: &str| text(name).and_then(|v| v.parse().ok());

        let limits = Self {
            requests_limit: number("x-ratelimit-limit-requests"),
            requests_remaining: number("x-ratelimit-remaining-requests"),
            requests_reset: text("x-ratelimit-reset-requests"),
            tokens_limit: number("x-ratelimit-limit-tokens"),
            tokens_remaining: number("x-ratelimit-remaining-tokens"),
            tokens_reset: text("x-ratelimit-reset-tokens"),
        };
        (limits != Self::default()).then_some(limits)
    }
}

/// A completed request.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// Reply text.
    pub content: String,
    /// Usage reported by the service, if any.
    pub usage: Option<TokenUsage>,
    /// Rate-limit state, if reported.
    pub rate_limits: Option<RateLimits>,
}

impl Completion {
    /// A completion with text and usage only.
    #[must_use]
    pub fn new(content: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            content: content.into(),
            usage,
            rate_limits: None,
        }
    }

    /// Reported usage, or zero when the service sent none.
    #[must_use]
    pub fn usage_or_default(&self) -> TokenUsage {
        self.usage.unwrap_or_default()
    }
}

/// The completion service.
///
/// One request is outstanding at a time; implementors must still be
/// `Send + Sync` so they can be held across `.await` points.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Request a completion for `messages`, in order.
    async fn complete(&self, messages: &[ChatMessage]) -> RequestResult<Completion>;
}
