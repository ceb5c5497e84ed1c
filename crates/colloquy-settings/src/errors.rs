//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a [`ColloquySettings`](crate::ColloquySettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON or has a mistyped field.
    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// The `.env` file exists but could not be read or parsed.
    #[error("invalid env file {}: {source}", path.display())]
    EnvFile {
        /// Env file.
        path: PathBuf,
        /// Underlying read or parse failure.
        #[source]
        source: dotenvy::Error,
    },
    /// The compiled defaults failed to serialize.
    #[error("default settings: {0}")]
    Defaults(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
