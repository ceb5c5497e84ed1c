//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 0. [`load_dotenv`] copies a `.env` file into the process environment,
//!    without replacing variables that are already set
//! 1. Start with compiled [`ColloquySettings::default()`]
//! 2. If `~/.colloquy/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::ColloquySettings;

/// Resolve the path to the settings file (`~/.colloquy/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".colloquy").join("settings.json")
}

/// Load `KEY=value` pairs from an env file into the process environment.
///
/// Variables already set win over the file. Returns `false` when the file
/// does not exist.
pub fn load_dotenv(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(?path, "loaded env file");
            Ok(true)
        }
        Err(e) if e.not_found() => Ok(false),
        Err(source) => Err(SettingsError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ColloquySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<ColloquySettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

/// Defaults deep-merged with the settings file, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<ColloquySettings> {
    let defaults = serde_json::to_value(ColloquySettings::default())?;
    if !path.exists() {
        debug!(?path, "settings file not found, using defaults");
        return Ok(serde_json::from_value(defaults)?);
    }

    debug!(?path, "loading settings from file");
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse = |source: serde_json::Error| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let user: Value = serde_json::from_str(&content).map_err(parse)?;
    serde_json::from_value(deep_merge(defaults, user)).map_err(parse)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides read through `lookup` (normally the process environment).
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in effect.
pub fn apply_overrides(settings: &mut ColloquySettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Paths ───────────────────────────────────────────────────────
    if let Some(v) = string("CHATS_PATH") {
        settings.paths.chats_dir = v;
    }
    if let Some(v) = string("INPUT_PATH") {
        settings.paths.input_dir = v;
    }
    if let Some(v) = string("OUTPUT_PATH") {
        settings.paths.output_dir = v;
    }

    // ── Usage ───────────────────────────────────────────────────────
    if let Some(v) = string("LOG_USAGE") {
        match parse_bool(&v) {
            Some(enabled) => settings.usage.log_usage = enabled,
            None => warn!(key = "LOG_USAGE", value = %v, "invalid boolean env var, ignoring"),
        }
    }

    // ── Model ───────────────────────────────────────────────────────
    if let Some(v) = string("INPUT_MAX_TOKENS") {
        match parse_u32_range(&v, 1, 10_000_000) {
            Some(n) => settings.model.input_max_tokens = Some(n),
            None => warn!(key = "INPUT_MAX_TOKENS", value = %v, "invalid u32 env var, ignoring"),
        }
    }
    if let Some(v) = string("COLLOQUY_MODEL") {
        settings.model.name = v;
    }

    // ── API / logging ───────────────────────────────────────────────
    if let Some(v) = string("COLLOQUY_BASE_URL") {
        settings.api.base_url = v;
    }
    if let Some(v) = string("COLLOQUY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("COLLOQUY_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "COLLOQUY_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
