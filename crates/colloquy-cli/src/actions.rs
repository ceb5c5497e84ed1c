//! The closed set of interactive actions.

use std::fmt;

/// An action chosen from the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Send a prompt.
    Prompt,
    /// Save the chat state under a name.
    Save,
    /// Export a plain-text transcript.
    Transcribe,
    /// Replace or clear the memory note.
    Memory,
    /// Select or add a condition.
    Condition,
    /// Summarize and archive history now.
    Compress,
    /// Leave, offering to save first.
    Exit,
}

impl Action {
    /// Every action, in menu order.
    pub const ALL: [Self; 7] = [
        Self::Prompt,
        Self::Save,
        Self::Transcribe,
        Self::Memory,
        Self::Condition,
        Self::Compress,
        Self::Exit,
    ];

    /// Parse menu input. Empty input means [`Action::Prompt`].
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "p" => Some(Self::Prompt),
            "s" => Some(Self::Save),
            "t" => Some(Self::Transcribe),
            "m" => Some(Self::Memory),
            "c" => Some(Self::Condition),
            "z" => Some(Self::Compress),
            "x" => Some(Self::Exit),
            _ => None,
        }
    }

    /// Menu key.
    pub fn key(self) -> char {
        match self {
            Self::Prompt => 'P',
            Self::Save => 'S',
            Self::Transcribe => 'T',
            Self::Memory => 'M',
            Self::Condition => 'C',
            Self::Compress => 'Z',
            Self::Exit => 'X',
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Prompt => "Prompt (default)",
            Self::Save => "Save Chat Session",
            Self::Transcribe => "Transcribe Chat",
            Self::Memory => "Edit Memory",
            Self::Condition => "Change Condition",
            Self::Compress => "Compress History",
            Self::Exit => "Close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.key(), self.label())
    }
}

/// The menu shown when the prompt is left empty.
pub fn menu() -> String {
    Action::ALL
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" - ")
}
