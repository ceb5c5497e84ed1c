//! File persistence for chat state, conditions, and transcripts.
//!
//! Reads map failures to [`LoadError`] carrying the offending path. Writes
//! create missing parent directories first.

use std::fs;
use std::io;
use std::path::Path;

use colloquy_core::condition::ConditionRecord;
use colloquy_core::{Condition, LoadError};
use tracing::{debug, info};

use crate::chat_state::ChatState;

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_creating_dirs(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// Load a saved chat.
pub fn load_chat_state(path: &Path) -> Result<ChatState, LoadError> {
    let state = ChatState::from_json(&read(path)?)?;
    info!(
        ?path,
        archived = state.messages.archive.len(),
        history = state.messages.history.len(),
        "loaded chat state"
    );
    Ok(state)
}

/// Save a chat.
pub fn save_chat_state(path: &Path, state: &ChatState) -> io::Result<()> {
    write_creating_dirs(path, &state.to_json()?)?;
    debug!(?path, history = state.messages.history.len(), "saved chat state");
    Ok(())
}

/// Load the saved conditions file (an ordered array of `{name, instructions}`).
///
/// Entries go through the same validation as [`Condition::new`].
pub fn load_conditions(path: &Path) -> Result<Vec<Condition>, LoadError> {
    let records: Vec<ConditionRecord> = serde_json::from_str(&read(path)?)?;
    let conditions = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            Condition::try_from(record).map_err(|e| LoadError::Invalid {
                field: format!("conditions[{index}].{}", e.field()),
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(?path, count = conditions.len(), "loaded conditions");
    Ok(conditions)
}

/// Save the conditions file.
pub fn save_conditions(path: &Path, conditions: &[Condition]) -> io::Result<()> {
    write_creating_dirs(path, &serde_json::to_string_pretty(conditions)?)?;
    debug!(?path, count = conditions.len(), "saved conditions");
    Ok(())
}

/// Write a rendered transcript.
pub fn write_transcript(path: &Path, transcript: &str) -> io::Result<()> {
    write_creating_dirs(path, transcript)?;
    debug!(?path, bytes = transcript.len(), "wrote transcript");
    Ok(())
}
