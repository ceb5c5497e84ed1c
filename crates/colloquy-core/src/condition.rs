//! Conditions: named, reusable system directives.
//!
//! At most one condition is active per chat. It is injected as the leading
//! system message at request composition time and never stored in history.

use serde::{Deserialize, Serialize};

use crate::errors::{ConditionError, EncodingError};
use crate::messages::{ChatMessage, Message, Role};
use crate::tokenizer::count_tokens;

/// A named system directive.
///
/// Serializes as `{"name", "instructions"}`; the token estimate is derived
/// on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConditionRecord")]
pub struct Condition {
    name: String,
    instructions: String,
    #[serde(skip)]
    tokens: u32,
}

/// Unvalidated persisted form of a [`Condition`].
#[derive(Clone, Debug, Deserialize)]
pub struct ConditionRecord {
    /// Display name.
    pub name: String,
    /// Directive text.
    pub instructions: String,
}

impl TryFrom<ConditionRecord> for Condition {
    type Error = ConditionError;

    fn try_from(record: ConditionRecord) -> Result<Self, Self::Error> {
        Self::new(record.name, record.instructions)
    }
}

impl Condition {
    /// Create a condition, estimating its tokens as a system message.
    ///
    /// The name must not be blank and the instructions must not be empty.
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Result<Self, ConditionError> {
        let name = name.into();
        let instructions = instructions.into();
        if name.trim().is_empty() {
            return Err(ConditionError::BlankName);
        }
        if instructions.is_empty() {
            return Err(EncodingError::empty(format!("condition \"{name}\"")).into());
        }
        let tokens = count_tokens(&format!("system {instructions}"));
        Ok(Self {
            name,
            instructions,
            tokens,
        })
    }

    /// Create a condition with an explicit token count.
    #[must_use]
    pub fn with_tokens(name: impl Into<String>, instructions: impl Into<String>, tokens: u32) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tokens,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directive text.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Token estimate.
    #[must_use]
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// The condition as a system message carrying its token estimate.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message::with_tokens(Role::System, self.instructions.clone(), self.tokens)
    }

    /// Wire form of this condition.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(Role::System, self.instructions.clone())
    }

    /// Whether `message` is this condition's directive.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        message.is_system() && message.content() == self.instructions
    }
}
