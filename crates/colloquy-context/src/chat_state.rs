//! Persisted chat state schema.
//!
//! ```json
//! {
//!   "messages": { "archive": [...], "history": [{"role", "content", "tokens"}] },
//!   "condition": { "name": "...", "instructions": "..." } | null,
//!   "memory": "..." | null
//! }
//! ```
//!
//! Messages and conditions are validated while deserializing, so a parsed
//! [`ChatState`] only ever holds well-formed entities. Files written before
//! the archive existed simply omit it, and older files naming the
//! history `recent` are accepted.

use colloquy_core::{Condition, LoadError, Message};
use serde::{Deserialize, Serialize};

use crate::message_store::MessageStore;

/// Serialized history and archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessages {
    /// Retired messages, oldest first.
    #[serde(default)]
    pub archive: Vec<Message>,
    /// Active history, oldest first.
    #[serde(alias = "recent")]
    pub history: Vec<Message>,
}

/// Everything needed to resume a chat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    /// History and archive.
    pub messages: StoredMessages,
    /// Active condition.
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Memory note text.
    #[serde(default)]
    pub memory: Option<String>,
}

/// Resumed session pieces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredChat {
    /// Rehydrated store.
    pub store: MessageStore,
    /// Active condition.
    pub condition: Option<Condition>,
    /// Memory note as a system message.
    pub memory: Option<Message>,
}

impl ChatState {
    /// Snapshot a session.
    #[must_use]
    pub fn capture(
        store: &MessageStore,
        condition: Option<&Condition>,
        memory: Option<&Message>,
    ) -> Self {
        Self {
            messages: StoredMessages {
                archive: store.archive().to_vec(),
                history: store.history().to_vec(),
            },
            condition: condition.cloned(),
            memory: memory.map(|m| m.content().to_string()),
        }
    }

    /// Parse and validate a serialized state.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Rebuild the store, condition and memory.
    ///
    /// A blank memory string means no memory note.
    pub fn restore(self) -> Result<RestoredChat, LoadError> {
        let memory = match self.memory {
            Some(note) if !note.trim().is_empty() => {
                Some(Message::memory(note).map_err(|e| LoadError::Invalid {
                    field: "memory".into(),
                    message: e.to_string(),
                })?)
            }
            _ => None,
        };
        Ok(RestoredChat {
            store: MessageStore::load_messages(self.messages.archive, self.messages.history),
            condition: self.condition,
            memory,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use colloquy_core::Role;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::System),
            Just(Role::User),
            Just(Role::Assistant),
            Just(Role::Function),
        ]
    }

    fn message_strategy() -> impl Strategy<Value = Message> {
        (role_strategy(), "[a-zA-Z0-9 .,!?]{1,40}", 0u32..10_000)
            .prop_map(|(role, content, tokens)| Message::with_tokens(role, content, tokens))
    }

    // -- parsing --

    #[test]
    fn parses_full_state() {
        let json = r#"{
            "messages": {
                "archive": [{"role": "user", "content": "old", "tokens": 3}],
                "history": [
                    {"role": "system", "content": "Chat History: s", "tokens": 7},
                    {"role": "user", "content": "hi", "tokens": 1}
                ]
            },
            "condition": {"name": "Narrator", "instructions": "You narrate."},
            "memory": "Ada is the hero."
        }"#;
        let restored = ChatState::from_json(json).unwrap().restore().unwrap();

        assert_eq!(restored.store.archive().len(), 1);
        assert_eq!(restored.store.total_tokens(), 8);
        assert_eq!(restored.condition.unwrap().name(), "Narrator");
        let memory = restored.memory.unwrap();
        assert!(memory.is_system());
        assert_eq!(memory.content(), "Ada is the hero.");
    }

    #[test]
    fn archive_condition_and_memory_are_optional() {
        let json = r#"{"messages": {"history": [{"role": "user", "content": "hello world"}]}}"#;
        let restored = ChatState::from_json(json).unwrap().restore().unwrap();
        assert!(restored.store.archive().is_empty());
        assert_eq!(restored.store.total_tokens(), 2);
        assert!(restored.condition.is_none());
        assert!(restored.memory.is_none());
    }

    #[test]
    fn accepts_recent_as_history() {
        let json = r#"{"messages": {"archive": [], "recent": [{"role": "user", "content": "hi", "tokens": 1}]}}"#;
        let restored = ChatState::from_json(json).unwrap().restore().unwrap();
        assert_eq!(restored.store.len(), 1);
    }

    #[test]
    fn null_condition_and_blank_memory() {
        let json = r#"{"messages": {"history": []}, "condition": null, "memory": "  "}"#;
        let restored = ChatState::from_json(json).unwrap().restore().unwrap();
        assert!(restored.condition.is_none());
        assert!(restored.memory.is_none());
    }

    #[test]
    fn rejects_unknown_role() {
        let json = r#"{"messages": {"history": [{"role": "robot", "content": "x"}]}}"#;
        assert_matches!(ChatState::from_json(json), Err(LoadError::Json(_)));
    }

    #[test]
    fn rejects_empty_message_content() {
        let json = r#"{"messages": {"history": [{"role": "user", "content": ""}]}}"#;
        assert_matches!(ChatState::from_json(json), Err(LoadError::Json(_)));
    }

    #[test]
    fn rejects_missing_messages() {
        assert_matches!(ChatState::from_json(r#"{"memory": "x"}"#), Err(LoadError::Json(_)));
    }

    // -- capture --

    #[test]
    fn capture_serializes_layout() {
        let mut store = MessageStore::new();
        store.add_message(Role::User, "hi", Some(1)).unwrap();
        let condition = Condition::with_tokens("Terse", "Be terse.", 3);
        let memory = Message::with_tokens(Role::System, "note", 1);

        let state = ChatState::capture(&store, Some(&condition), Some(&memory));
        let value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "messages": {
                    "archive": [],
                    "history": [{"role": "user", "content": "hi", "tokens": 1}]
                },
                "condition": {"name": "Terse", "instructions": "Be terse."},
                "memory": "note"
            })
        );
    }

    // -- properties --

    proptest! {
        #[test]
        fn round_trip_preserves_timeline(
            archive in proptest::collection::vec(message_strategy(), 0..10),
            history in proptest::collection::vec(message_strategy(), 0..10),
        ) {
            let store = MessageStore::load_messages(archive, history);
            let json = ChatState::capture(&store, None, None).to_json().unwrap();
            let restored = ChatState::from_json(&json).unwrap().restore().unwrap();

            let before: Vec<&Message> = store.timeline().collect();
            let after: Vec<&Message> = restored.store.timeline().collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(restored.store.archive().len(), store.archive().len());
        }
    }
}
