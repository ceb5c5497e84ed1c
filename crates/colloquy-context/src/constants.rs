//! Context subsystem constants.

// =============================================================================
// Compression
// =============================================================================

/// Prefix of the system message that replaces a compressed window.
pub const SUMMARY_PREFIX: &str = "Chat History: ";

/// Instruction appended (as a user message) to the window sent for summary.
pub const SUMMARY_INSTRUCTION: &str =
    "Please write a condensed summary of the chat so far that GPT would understand as a system message.";

// =============================================================================
// Persistence
// =============================================================================

/// Default chat name for saves and the autosave file.
pub const DEFAULT_CHAT_NAME: &str = "chat_backup";

/// Default transcript name.
pub const DEFAULT_TRANSCRIPT_NAME: &str = "chat";
