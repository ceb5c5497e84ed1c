//! # colloquy-core
//!
//! Foundation types shared by every Colloquy crate:
//!
//! - **Messages**: [`Message`] with a [`Role`] and an estimated token count,
//!   plus the [`ChatMessage`] wire pair sent to the completion service
//! - **Conditions**: [`Condition`], a named reusable system directive
//! - **Tokenizer**: [`tokenizer::count_tokens`], the local token estimator
//! - **Errors**: [`EncodingError`], [`ConditionError`] and [`LoadError`] via
//!   `thiserror`

#![deny(unsafe_code)]

pub mod condition;
pub mod errors;
pub mod messages;
pub mod tokenizer;

pub use condition::Condition;
pub use errors::{ConditionError, EncodingError, LoadError};
pub use messages::{ChatMessage, Message, Role, TokenUsage};
