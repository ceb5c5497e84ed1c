//! Summarize-and-archive compression.
//!
//! The [`Compressor`] sends the current history window to the completion
//! service with a summary instruction, then atomically replaces the window
//! with a single system message and moves the originals into the archive.
//!
//! ## States
//!
//! `Idle → Compressing → Idle`. The transition back to `Idle` happens on
//! success and on failure alike; a failed summary leaves the store exactly
//! as it was, so the trigger is simply re-evaluated on the next cycle.
//!
//! ## Resulting history
//!
//! ```text
//! [system] <condition instructions>       (only if it led the old history)
//! [system] "Chat History: <summary>"
//! ```

use colloquy_core::{ChatMessage, Condition, Message, Role, TokenUsage};
use colloquy_llm::CompletionProvider;
use tracing::{info, warn};

use crate::constants::{SUMMARY_INSTRUCTION, SUMMARY_PREFIX};
use crate::errors::CompressionError;
use crate::message_store::MessageStore;

/// Compressor lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressorState {
    /// Not compressing.
    #[default]
    Idle,
    /// A summary request is outstanding.
    Compressing,
}

/// What a compression run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionOutcome {
    /// Messages moved into the archive.
    pub archived: usize,
    /// History tokens before the run.
    pub tokens_before: u64,
    /// History tokens after the run.
    pub tokens_after: u64,
    /// Summary text returned by the service (without the prefix).
    pub summary: String,
    /// Usage reported for the summary request.
    pub usage: Option<TokenUsage>,
}

impl CompressionOutcome {
    fn skipped(tokens: u64) -> Self {
        Self {
            archived: 0,
            tokens_before: tokens,
            tokens_after: tokens,
            summary: String::new(),
            usage: None,
        }
    }

    /// Whether there was nothing to summarize.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.archived == 0
    }
}

/// Drives compression of a [`MessageStore`].
#[derive(Clone, Debug)]
pub struct Compressor {
    threshold: u64,
    state: CompressorState,
}

impl Compressor {
    /// Create a compressor that triggers at `max_input_tokens - response_reserve`.
    #[must_use]
    pub fn new(max_input_tokens: u64, response_reserve: u64) -> Self {
        Self {
            threshold: max_input_tokens.saturating_sub(response_reserve),
            state: CompressorState::Idle,
        }
    }

    /// History token count at which compression is due.
    #[must_use]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CompressorState {
        self.state
    }

    /// Whether `store` has reached the trigger.
    #[must_use]
    pub fn should_compress(&self, store: &MessageStore) -> bool {
        !store.is_empty() && store.total_tokens() >= self.threshold
    }

    /// Summarize the history window and archive it.
    ///
    /// A condition message at `history[0]` is left out of the summary and
    /// kept ahead of the summary message. On error the store is untouched.
    pub async fn compress(
        &mut self,
        store: &mut MessageStore,
        condition: Option<&Condition>,
        provider: &dyn CompletionProvider,
    ) -> Result<CompressionOutcome, CompressionError> {
        self.state = CompressorState::Compressing;
        let result = Self::run(store, condition, provider).await;
        self.state = CompressorState::Idle;
        result
    }

    async fn run(
        store: &mut MessageStore,
        condition: Option<&Condition>,
        provider: &dyn CompletionProvider,
    ) -> Result<CompressionOutcome, CompressionError> {
        let tokens_before = store.total_tokens();
        let keep = usize::from(
            condition.is_some_and(|c| store.history().first().is_some_and(|m| c.matches(m))),
        );
        let to_summarize = &store.history()[keep..];

        if to_summarize.is_empty() {
            info!(history = store.len(), "compression skipped: nothing to summarize");
            return Ok(CompressionOutcome::skipped(tokens_before));
        }

        info!(
            messages = to_summarize.len(),
            tokens_before,
            model = provider.model(),
            "compressing history via summary"
        );

        let mut request: Vec<ChatMessage> =
            to_summarize.iter().map(Message::to_chat_message).collect();
        request.push(ChatMessage::new(Role::User, SUMMARY_INSTRUCTION));

        let completion = provider.complete(&request).await.inspect_err(|e| {
            warn!(error = %e, "summary request failed, history unchanged");
        })?;

        let summary_message = Message::system(format!("{SUMMARY_PREFIX}{}", completion.content))?;
        let archived = store.replace_window(keep, summary_message);
        let tokens_after = store.total_tokens();

        info!(
            archived,
            tokens_before,
            tokens_after,
            tokens_saved = tokens_before.saturating_sub(tokens_after),
            "compression complete"
        );

        Ok(CompressionOutcome {
            archived,
            tokens_before,
            tokens_after,
            summary: completion.content,
            usage: completion.usage,
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
    use colloquy_llm::{Completion, RequestError, RequestResult};
    use proptest::prelude::*;
    use std::sync::Mutex;

    // -- Mock providers --

    struct MockSummarizer {
        summary: String,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl MockSummarizer {
        fn new(summary: &str) -> Self {
            Self {
                summary: summary.into(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<ChatMessage> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for MockSummarizer {
        fn model(&self) -> &str {
            "mock"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> RequestResult<Completion> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok(Completion::new(
                self.summary.clone(),
                Some(TokenUsage::new(100, 20)),
            ))
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for FailingProvider {
        fn model(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> RequestResult<Completion> {
            Err(RequestError::RateLimited {
                retry_after_ms: None,
                message: "slow down".into(),
            })
        }
    }

    fn msg(role: Role, content: &str, tokens: u32) -> Message {
        Message::with_tokens(role, content, tokens)
    }

    fn conversation() -> MessageStore {
        MessageStore::load_messages(
            vec![msg(Role::User, "earlier", 9)],
            vec![
                msg(Role::User, "q1", 40),
                msg(Role::Assistant, "a1", 50),
                msg(Role::User, "q2", 30),
            ],
        )
    }

    // -- trigger --

    #[test]
    fn trigger_at_threshold() {
        let compressor = Compressor::new(720, 600);
        assert_eq!(compressor.threshold(), 120);
        assert!(compressor.should_compress(&conversation()));
        assert!(!Compressor::new(721, 600).should_compress(&conversation()));
    }

    #[test]
    fn empty_store_never_triggers() {
        assert!(!Compressor::new(0, 600).should_compress(&MessageStore::new()));
    }

    // -- compress --

    #[tokio::test]
    async fn compress_archives_window_and_installs_summary() {
        let provider = MockSummarizer::new("They met.");
        let mut compressor = Compressor::new(100, 0);
        let mut store = conversation();

        let outcome = compressor.compress(&mut store, None, &provider).await.unwrap();

        assert_eq!(outcome.archived, 3);
        assert_eq!(outcome.tokens_before, 120);
        assert_eq!(outcome.summary, "They met.");
        assert_eq!(outcome.usage, Some(TokenUsage::new(100, 20)));
        assert_eq!(compressor.state(), CompressorState::Idle);

        let archive: Vec<&str> = store.archive().iter().map(Message::content).collect();
        assert_eq!(archive, ["earlier", "q1", "a1", "q2"]);
        assert_eq!(store.len(), 1);
        let summary = &store.history()[0];
        assert!(summary.is_system());
        assert_eq!(summary.content(), "Chat History: They met.");
        assert_eq!(outcome.tokens_after, u64::from(summary.tokens()));
    }

    #[tokio::test]
    async fn summary_request_ends_with_instruction() {
        let provider = MockSummarizer::new("s");
        let mut store = conversation();
        let _ = Compressor::new(100, 0)
            .compress(&mut store, None, &provider)
            .await
            .unwrap();

        let seen = provider.seen();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].content, "q1");
        let last = seen.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, SUMMARY_INSTRUCTION);
    }

    #[tokio::test]
    async fn leading_condition_is_kept_and_not_summarized() {
        let condition = Condition::with_tokens("Narrator", "You narrate.", 4);
        let provider = MockSummarizer::new("s");
        let mut store = MessageStore::load_messages(
            Vec::new(),
            vec![
                condition.to_message(),
                msg(Role::User, "q1", 40),
                msg(Role::Assistant, "a1", 50),
            ],
        );

        let outcome = Compressor::new(10, 0)
            .compress(&mut store, Some(&condition), &provider)
            .await
            .unwrap();

        assert_eq!(outcome.archived, 2);
        assert!(provider.seen().iter().all(|m| m.content != "You narrate."));
        let history: Vec<&str> = store.history().iter().map(Message::content).collect();
        assert_eq!(history, ["You narrate.", "Chat History: s"]);
    }

    #[tokio::test]
    async fn unrelated_leading_system_message_is_summarized() {
        let condition = Condition::with_tokens("Narrator", "You narrate.", 4);
        let provider = MockSummarizer::new("s");
        let mut store = MessageStore::load_messages(
            Vec::new(),
            vec![msg(Role::System, "Chat History: older", 5), msg(Role::User, "q", 5)],
        );

        let outcome = Compressor::new(1, 0)
            .compress(&mut store, Some(&condition), &provider)
            .await
            .unwrap();
        assert_eq!(outcome.archived, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn nothing_to_summarize_is_skipped() {
        let condition = Condition::with_tokens("Narrator", "You narrate.", 4);
        let provider = MockSummarizer::new("s");
        let mut store = MessageStore::load_messages(Vec::new(), vec![condition.to_message()]);

        let outcome = Compressor::new(1, 0)
            .compress(&mut store, Some(&condition), &provider)
            .await
            .unwrap();
        assert!(outcome.is_skipped());
        assert!(provider.seen().is_empty());
        assert_eq!(store.len(), 1);
        assert!(store.archive().is_empty());
    }

    #[tokio::test]
    async fn failure_leaves_store_untouched() {
        let mut compressor = Compressor::new(100, 0);
        let mut store = conversation();
        let before = store.clone();

        let err = compressor
            .compress(&mut store, None, &FailingProvider)
            .await
            .unwrap_err();

        assert_matches!(err, CompressionError::Request(RequestError::RateLimited { .. }));
        assert!(err.is_retryable());
        assert_eq!(store, before);
        assert_eq!(compressor.state(), CompressorState::Idle);
    }

    #[tokio::test]
    async fn failure_with_leading_condition_leaves_store_untouched() {
        let condition = Condition::with_tokens("Narrator", "You narrate.", 4);
        let mut compressor = Compressor::new(10, 0);
        let mut store = MessageStore::load_messages(
            vec![msg(Role::User, "earlier", 9)],
            vec![
                condition.to_message(),
                msg(Role::User, "q1", 40),
                msg(Role::Assistant, "a1", 50),
            ],
        );
        let before = store.clone();

        let result = compressor
            .compress(&mut store, Some(&condition), &FailingProvider)
            .await;

        assert_matches!(result, Err(CompressionError::Request(_)));
        assert_eq!(store, before);
        assert!(condition.matches(&store.history()[0]));
        assert_eq!(store.archive().len(), 1);
        assert_eq!(compressor.state(), CompressorState::Idle);
    }

    #[tokio::test]
    async fn empty_summary_is_still_encodable() {
        let provider = MockSummarizer::new("");
        let mut store = conversation();
        let outcome = Compressor::new(100, 0)
            .compress(&mut store, None, &provider)
            .await
            .unwrap();
        assert_eq!(store.history()[0].content(), "Chat History: ");
        assert_eq!(outcome.archived, 3);
    }

    // -- properties --

    proptest! {
        #[test]
        fn archive_is_append_only(
            archived in proptest::collection::vec(1u32..100, 0..8),
            history in proptest::collection::vec(1u32..100, 1..8),
            lead_condition in any::<bool>(),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let condition = Condition::with_tokens("Narrator", "You narrate.", 4);
            let archive: Vec<Message> = archived
                .iter()
                .map(|t| msg(Role::User, "old", *t))
                .collect();
            let history: Vec<Message> = history
                .iter()
                .enumerate()
                .map(|(i, t)| msg(Role::Assistant, &format!("h{i}"), *t))
                .collect();
            let mut window = Vec::new();
            if lead_condition {
                window.push(condition.to_message());
            }
            window.extend(history.iter().cloned());
            let mut store = MessageStore::load_messages(archive.clone(), window);
            let provider = MockSummarizer::new("summary");

            let outcome = runtime
                .block_on(Compressor::new(0, 0).compress(&mut store, Some(&condition), &provider))
                .unwrap();

            let mut expected = archive;
            expected.extend(history);
            prop_assert_eq!(store.archive(), expected.as_slice());
            prop_assert_eq!(outcome.archived, expected.len() - archived.len());
            if lead_condition {
                prop_assert_eq!(store.len(), 2);
                prop_assert!(condition.matches(&store.history()[0]));
            } else {
                prop_assert_eq!(store.len(), 1);
            }
            prop_assert!(store.history().last().unwrap().content().starts_with(SUMMARY_PREFIX));
        }
    }
}
