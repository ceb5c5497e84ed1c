//! Conversation history with an append-only archive.
//!
//! [`MessageStore`] holds the chronological `history` that requests are
//! composed from and the `archive` of messages retired by compression. The
//! conceptual timeline is always `archive ++ history`: messages are only
//! ever relocated, never dropped.
//!
//! Token totals are recomputed from the messages on every call so they can
//! never drift from the stored estimates.

use colloquy_core::{EncodingError, Message, Role, TokenUsage};
use tracing::debug;

use crate::transcript::TranscriptEntry;

/// History plus archive for one chat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageStore {
    history: Vec<Message>,
    archive: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted messages, preserving order and counts.
    #[must_use]
    pub fn load_messages(archive: Vec<Message>, history: Vec<Message>) -> Self {
        debug!(
            archived = archive.len(),
            history = history.len(),
            "rehydrated message store"
        );
        Self { history, archive }
    }

    /// Append a message, estimating tokens unless `tokens` is supplied.
    ///
    /// No capacity check happens here; composition and compression own the
    /// budget policy.
    pub fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        tokens: Option<u32>,
    ) -> Result<(), EncodingError> {
        let message = Message::from_parts(role, content, tokens)?;
        self.push(message);
        Ok(())
    }

    /// Append an already-built message.
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Sum of token estimates over `history` (the archive is never resubmitted).
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.history.iter().map(|m| u64::from(m.tokens())).sum()
    }

    /// Chronological history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Retired messages, oldest first.
    #[must_use]
    pub fn archive(&self) -> &[Message] {
        &self.archive
    }

    /// The full timeline: archive followed by history.
    pub fn timeline(&self) -> impl Iterator<Item = &Message> {
        self.archive.iter().chain(self.history.iter())
    }

    /// Number of messages in history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Most recent history message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Reconcile the latest user and assistant messages against reported usage.
    ///
    /// Earlier messages keep their estimates. Returns the total drift applied.
    pub fn reconcile_last(&mut self, usage: &TokenUsage) -> i64 {
        let mut drift = 0;
        if let Some(user) = self.history.iter_mut().rev().find(|m| m.is_user()) {
            drift += user.reconcile_usage(usage).unwrap_or_default();
        }
        if let Some(assistant) = self.history.iter_mut().rev().find(|m| m.is_assistant()) {
            drift += assistant.reconcile_usage(usage).unwrap_or_default();
        }
        drift
    }

    /// Labeled timeline entries matching `predicate`, in chronological order.
    pub fn transcribe(&self, predicate: impl Fn(&Message) -> bool) -> Vec<TranscriptEntry> {
        self.timeline()
            .filter(|m| predicate(m))
            .map(TranscriptEntry::from_message)
            .collect()
    }

    /// Retire `history[keep..]` into the archive and append `summary`.
    ///
    /// The first `keep` history messages stay in place ahead of the summary.
    /// Returns the number of messages archived.
    pub(crate) fn replace_window(&mut self, keep: usize, summary: Message) -> usize {
        let keep = keep.min(self.history.len());
        let retired: Vec<Message> = self.history.drain(keep..).collect();
        let count = retired.len();
        self.archive.extend(retired);
        self.history.push(summary);
        count
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
