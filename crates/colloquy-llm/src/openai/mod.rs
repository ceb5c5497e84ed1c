//! `OpenAI` chat-completions backend.

pub mod provider;
pub mod types;

pub use provider::OpenAiProvider;
pub use types::{DEFAULT_BASE_URL, NO_RESPONSE_CONTENT, OpenAiConfig};
