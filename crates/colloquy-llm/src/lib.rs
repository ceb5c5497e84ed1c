//! # colloquy-llm
//!
//! The completion boundary.
//!
//! Defines the [`CompletionProvider`] trait the conversation core talks to,
//! the [`Completion`] it returns, and [`RequestError`] for transport, auth,
//! and rate-limit failures. [`openai::OpenAiProvider`] implements the trait
//! over the `OpenAI` chat-completions API.

#![deny(unsafe_code)]

pub mod openai;
pub mod provider;

pub use provider::{Completion, CompletionProvider, RateLimits, RequestError, RequestResult};
