//! Error types shared across the Colloquy crates.
//!
//! - [`EncodingError`]: token estimation was asked to encode empty content.
//!   A programmer-error guard; it fails the single operation only.
//! - [`ConditionError`]: a condition had a blank name or no instructions.
//! - [`LoadError`]: a chat state or conditions file was missing, unreadable,
//!   or did not match the expected schema.

use std::path::PathBuf;

use thiserror::Error;

/// Attempted to estimate tokens for empty content.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no content to encode for {subject}")]
pub struct EncodingError {
    /// What was being encoded (e.g. `"user message"`, `"condition"`).
    pub subject: String,
}

impl EncodingError {
    /// Create an encoding error for the given subject.
    #[must_use]
    pub fn empty(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// A condition could not be built.
///
/// The same rule applies to conditions typed in by the user and to those
/// read from disk, so anything that can be saved can be loaded back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    /// The name was empty or whitespace.
    #[error("condition name must not be blank")]
    BlankName,

    /// The instructions were empty.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl ConditionError {
    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::BlankName => "name",
            Self::Encoding(_) => "instructions",
        }
    }
}

/// Failure loading persisted state.
///
/// Recovered locally by callers: the session proceeds with an empty store or
/// default conditions and the user is told what went wrong.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid JSON or did not match the schema.
    #[error("failed to parse state JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed but a value was unacceptable.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Offending field path.
        field: String,
        /// Human-readable reason.
        message: String,
    },
}

impl LoadError {
    /// Whether the underlying cause is a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
