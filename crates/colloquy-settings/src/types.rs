//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON works: missing fields take their default during deserialization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "model": { "name": "gpt-3.5-turbo-16k", "responseReserve": 800 },
///   "paths": { "chatsDir": "~/chats" },
///   "usage": { "logUsage": true }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColloquySettings {
    /// Model selection and token budget.
    pub model: ModelSettings,
    /// Directories for chats, inputs, and outputs.
    pub paths: PathSettings,
    /// Usage/cost reporting.
    pub usage: UsageSettings,
    /// Completion service endpoint.
    pub api: ApiSettings,
    /// Diagnostic logging.
    pub logging: LoggingSettings,
}

/// Model selection and token budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Model name or alias (`gpt-4`, `gpt-3.5-16k`, ...).
    pub name: String,
    /// Override for the model's maximum input tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_max_tokens: Option<u32>,
    /// Headroom kept free for the model's reply.
    pub response_reserve: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4".to_string(),
            input_max_tokens: None,
            response_reserve: 600,
        }
    }
}

/// Directories for persisted state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathSettings {
    /// Saved chat sessions (`<name>.json`).
    pub chats_dir: String,
    /// Inputs such as `conditions.json`.
    pub input_dir: String,
    /// Autosave, transcripts, and the cost log.
    pub output_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            chats_dir: "./chats".to_string(),
            input_dir: "./input".to_string(),
            output_dir: "./output".to_string(),
        }
    }
}

impl PathSettings {
    /// Saved conditions library.
    #[must_use]
    pub fn conditions_file(&self) -> PathBuf {
        PathBuf::from(&self.input_dir).join("conditions.json")
    }

    /// Chat state autosaved after every exchange.
    #[must_use]
    pub fn autosave_file(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join("chat_backup.json")
    }

    /// Append-only cost log.
    #[must_use]
    pub fn cost_log_file(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join("cost_log.txt")
    }

    /// A named saved chat.
    #[must_use]
    pub fn chat_file(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.chats_dir).join(format!("{name}.json"))
    }

    /// A named transcript export.
    #[must_use]
    pub fn transcript_file(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.output_dir).join(format!("{name}.txt"))
    }
}

/// Usage/cost reporting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageSettings {
    /// Print request/session cost and append it to the cost log.
    pub log_usage: bool,
}

/// Completion service endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Diagnostic logging.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Emit newline-delimited JSON instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
