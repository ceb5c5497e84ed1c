//! # colloquy-settings
//!
//! Configuration with layered sources for the Colloquy chat client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ColloquySettings::default()`]
//! 2. **User file** — `~/.colloquy/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `CHATS_PATH`, `LOG_USAGE`, `COLLOQUY_*`, ...
//!
//! Settings are loaded once at startup and passed explicitly to whatever
//! needs them.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_dotenv, load_settings, load_settings_from_path, settings_path};
pub use types::*;
