//! Message types for the Colloquy conversation model.
//!
//! A [`Message`] is an immutable role + content pair carrying an estimated
//! token count. The count is computed from the content at construction
//! unless an explicit value is supplied (rehydration, reconciliation).
//! The only mutation a message ever sees is [`Message::reconcile_tokens`],
//! which narrows estimation error without touching role or content.
//!
//! [`ChatMessage`] is the `{role, content}` wire pair submitted to the
//! completion service.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EncodingError;
use crate::tokenizer::count_tokens;

// ─────────────────────────────────────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System directive (conditions, memory, summaries).
    System,
    /// Human input.
    User,
    /// Model reply.
    Assistant,
    /// Function call output.
    Function,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }

    /// Human-readable label used in transcripts.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "Prompt",
            Self::Assistant => "Response",
            Self::Function => "Function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// A `{role, content}` pair as submitted to the completion service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a wire message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Token usage reported by the completion service for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the submitted prompt.
    pub prompt_tokens: u32,
    /// Tokens in the generated completion.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Create a usage record.
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Prompt plus completion tokens.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A single conversation message with its token estimate.
///
/// Serializes as `{"role", "content", "tokens"}`. Deserialization goes
/// through [`MessageRecord`] so that a missing `tokens` field is re-derived
/// from content and empty content is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord")]
pub struct Message {
    role: Role,
    content: String,
    tokens: u32,
}

/// Unvalidated persisted form of a [`Message`].
#[derive(Clone, Debug, Deserialize)]
pub struct MessageRecord {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Persisted token count, if any.
    #[serde(default)]
    pub tokens: Option<u32>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = EncodingError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        if record.content.is_empty() {
            return Err(EncodingError::empty(format!("{} message", record.role)));
        }
        Self::from_parts(record.role, record.content, record.tokens)
    }
}

impl Message {
    /// Create a message, estimating tokens from `content`.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, EncodingError> {
        Self::from_parts(role, content, None)
    }

    /// Create a message with an explicit token count (no estimation).
    #[must_use]
    pub fn with_tokens(role: Role, content: impl Into<String>, tokens: u32) -> Self {
        Self {
            role,
            content: content.into(),
            tokens,
        }
    }

    /// Create a message, reusing `tokens` when supplied and estimating otherwise.
    pub fn from_parts(
        role: Role,
        content: impl Into<String>,
        tokens: Option<u32>,
    ) -> Result<Self, EncodingError> {
        let content = content.into();
        let tokens = match tokens {
            Some(tokens) => tokens,
            None => encode(role, &content)?,
        };
        Ok(Self {
            role,
            content,
            tokens,
        })
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Result<Self, EncodingError> {
        Self::new(Role::User, content)
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Result<Self, EncodingError> {
        Self::new(Role::Assistant, content)
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Result<Self, EncodingError> {
        Self::new(Role::System, content)
    }

    /// The memory note: a system message injected ahead of history on every
    /// request. Never part of the history itself.
    pub fn memory(note: impl Into<String>) -> Result<Self, EncodingError> {
        Self::new(Role::System, note)
    }

    /// Message role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Message text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Current token count (estimated or reconciled).
    #[must_use]
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// Returns `true` for user messages.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns `true` for assistant messages.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Returns `true` for system messages.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Replace the token estimate with an actual count.
    ///
    /// Returns the drift (`actual - estimate`).
    pub fn reconcile_tokens(&mut self, actual: u32) -> i64 {
        let drift = i64::from(actual) - i64::from(self.tokens);
        debug!(role = %self.role, estimate = self.tokens, actual, drift, "reconciled token estimate");
        self.tokens = actual;
        drift
    }

    /// Reconcile against server-reported usage.
    ///
    /// User messages take `prompt_tokens`, assistant messages take
    /// `completion_tokens`. Other roles are left untouched and return `None`.
    pub fn reconcile_usage(&mut self, usage: &TokenUsage) -> Option<i64> {
        match self.role {
            Role::User => Some(self.reconcile_tokens(usage.prompt_tokens)),
            Role::Assistant => Some(self.reconcile_tokens(usage.completion_tokens)),
            Role::System | Role::Function => None,
        }
    }

    /// Wire form of this message.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

fn encode(role: Role, content: &str) -> Result<u32, EncodingError> {
    if content.is_empty() {
        return Err(EncodingError::empty(format!("{role} message")));
    }
    Ok(count_tokens(content))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
