//! # colloquy-logging
//!
//! Structured logging with `tracing` and the append-only usage log.
//!
//! - [`init_subscriber`] sets up the global `tracing` subscriber on stderr
//! - [`UsageLog`] appends one cost line per request to `cost_log.txt`
//!
//! Diagnostics go to stderr so they never interleave with the chat itself,
//! which is written to stdout.

#![deny(unsafe_code)]

pub mod usage_log;

pub use usage_log::{UsageLog, format_cost_line};

use tracing_subscriber::EnvFilter;

/// Output layout for diagnostic logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human-readable records.
    #[default]
    Compact,
    /// Newline-delimited JSON records.
    Json,
}

/// Build the level filter. `RUST_LOG` wins over `level`; an unparsable
/// `level` falls back to `warn`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only when a global subscriber is already installed
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
