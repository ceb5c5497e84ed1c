//! Append-only request cost log.
//!
//! One line per request:
//! `Estimates- Request: $0.002 - Session: $0.010 - Messages: 12`

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use colloquy_tokens::{RequestCost, format_cost};
use tracing::debug;

/// Format one cost log line (newline-terminated).
#[must_use]
pub fn format_cost_line(cost: &RequestCost, message_count: usize) -> String {
    format!(
        "Estimates- Request: {} - Session: {} - Messages: {message_count}\n",
        format_cost(cost.request),
        format_cost(cost.session),
    )
}

/// Cost log file writer.
#[derive(Clone, Debug)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    /// Log writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a cost line, creating the file and its directory if needed.
    pub fn append(&self, cost: &RequestCost, message_count: usize) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_cost_line(cost, message_count).as_bytes())?;
        debug!(path = %self.path.display(), "appended cost line");
        Ok(())
    }
}
