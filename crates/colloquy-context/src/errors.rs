//! Context error types.

use colloquy_core::EncodingError;
use colloquy_llm::RequestError;
use thiserror::Error;

/// Summarization failed. The store is left exactly as it was.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// The summary request failed.
    #[error("summary request failed: {0}")]
    Request(#[from] RequestError),

    /// The returned summary could not be turned into a message.
    #[error("summary could not be encoded: {0}")]
    Encoding(#[from] EncodingError),
}

impl CompressionError {
    /// Whether retrying the compression may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_retryable(),
            Self::Encoding(_) => false,
        }
    }
}
