//! Plain-text transcript export.
//!
//! Each entry renders as `"<Label>:\n<content>\n\n"`.

use colloquy_core::Message;

/// One labeled transcript block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Role label (`Prompt`, `Response`, `System`, `Function`).
    pub label: &'static str,
    /// Message text.
    pub content: String,
}

impl TranscriptEntry {
    /// Label and copy a message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            label: message.role().label(),
            content: message.content().to_string(),
        }
    }
}

/// Render entries in order as transcript text.
#[must_use]
pub fn render_transcript(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}:\n{}\n\n", e.label, e.content))
        .collect()
}
