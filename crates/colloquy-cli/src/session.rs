//! The explicit chat session.
//!
//! [`ChatSession`] owns everything one conversation needs: the store, the
//! active condition and memory note, the composer and compressor sized for
//! the model, the cost tracker, and the completion provider. It is built
//! once at startup and passed by `&mut` to whatever drives it.
//!
//! [`ChatSession::prompt_cycle`] is the one entry point for a prompt. It
//! runs a due compression to completion before composing, so no request is
//! ever built from history that has reached the trigger.
//!
//! A prompt is buffered as a pending message until its reply arrives. Both
//! are committed to history together, so a failed request leaves the store
//! exactly as it was.

use colloquy_context::{
    ChatState, CompressionError, CompressionOutcome, Compressor, MessageStore, RequestComposer,
    RestoredChat, TranscriptEntry,
};
use colloquy_core::{Condition, EncodingError, Message, TokenUsage};
use colloquy_llm::{CompletionProvider, RequestError};
use colloquy_settings::ModelSettings;
use colloquy_tokens::{CostTracker, ModelInfo, RequestCost};
use tracing::{debug, info, warn};

/// Errors from a prompt/response cycle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The prompt or reply had no content to encode.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The completion request failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The prompt alone does not fit the input budget.
    #[error("prompt needs {tokens} tokens but the input budget is {budget}")]
    PromptTooLarge {
        /// Estimated prompt tokens.
        tokens: u32,
        /// Available input tokens after condition and memory.
        budget: u64,
    },
}

/// A completed prompt/response cycle.
#[derive(Clone, Debug)]
pub struct Reply {
    /// Reply text.
    pub content: String,
    /// Cost of this request and the session so far.
    pub cost: RequestCost,
    /// Usage reported by the service, if any.
    pub usage: Option<TokenUsage>,
    /// Older history messages left out of the request.
    pub excluded: usize,
}

/// A completed compression.
#[derive(Clone, Debug)]
pub struct Compression {
    /// What the compressor did.
    pub outcome: CompressionOutcome,
    /// Cost of the summary request, when one was made.
    pub cost: Option<RequestCost>,
}

/// Everything one prompt produced.
#[derive(Debug)]
pub struct Exchange {
    /// The compression run before composing, when the trigger was reached.
    /// A failed compression leaves history as it was and the prompt is still
    /// sent.
    pub compression: Option<Result<Compression, CompressionError>>,
    /// The reply, or why there is none.
    pub reply: Result<Reply, SessionError>,
}

/// One conversation and its collaborators.
pub struct ChatSession {
    store: MessageStore,
    condition: Option<Condition>,
    memory: Option<Message>,
    model: ModelInfo,
    composer: RequestComposer,
    compressor: Compressor,
    costs: CostTracker,
    provider: Box<dyn CompletionProvider>,
}

impl ChatSession {
    /// Create an empty session for `model`.
    ///
    /// The input budget is the model window (or the configured override)
    /// minus the response reserve.
    pub fn new(
        model: ModelInfo,
        settings: &ModelSettings,
        provider: Box<dyn CompletionProvider>,
    ) -> Self {
        let max_input = u64::from(settings.input_max_tokens.unwrap_or(model.max_tokens));
        let reserve = u64::from(settings.response_reserve);
        let budget = max_input.saturating_sub(reserve);
        if budget == 0 {
            warn!(max_input, reserve, "response reserve leaves no input budget");
        }
        info!(model = %model.name, max_input, reserve, budget, "chat session created");

        Self {
            store: MessageStore::new(),
            condition: None,
            memory: None,
            model,
            composer: RequestComposer::new(budget),
            compressor: Compressor::new(max_input, reserve),
            costs: CostTracker::new(),
            provider,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Conversation store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Active condition.
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Memory note.
    pub fn memory(&self) -> Option<&Message> {
        self.memory.as_ref()
    }

    /// Model in use.
    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    /// Input budget per request.
    pub fn budget(&self) -> u64 {
        self.composer.max_input_tokens()
    }

    /// Cumulative session cost.
    pub fn session_cost(&self) -> f64 {
        self.costs.session_cost()
    }

    /// Requests costed so far, summaries included.
    pub fn request_count(&self) -> u64 {
        self.costs.request_count()
    }

    // ── State changes ────────────────────────────────────────────────────

    /// Replace the active condition.
    pub fn set_condition(&mut self, condition: Option<Condition>) {
        debug!(condition = ?condition.as_ref().map(Condition::name), "condition changed");
        self.condition = condition;
    }

    /// Replace the memory note. Blank text clears it.
    pub fn set_memory(&mut self, note: &str) -> Result<(), EncodingError> {
        if note.trim().is_empty() {
            self.clear_memory();
            return Ok(());
        }
        let memory = Message::memory(note)?;
        debug!(tokens = memory.tokens(), "memory changed");
        self.memory = Some(memory);
        Ok(())
    }

    /// Drop the memory note.
    pub fn clear_memory(&mut self) {
        if self.memory.take().is_some() {
            debug!("memory cleared");
        }
    }

    /// Adopt a resumed chat.
    pub fn restore(&mut self, restored: RestoredChat) {
        info!(
            archived = restored.store.archive().len(),
            history = restored.store.len(),
            "restored chat"
        );
        self.store = restored.store;
        self.condition = restored.condition;
        self.memory = restored.memory;
    }

    /// Snapshot for persistence.
    pub fn snapshot(&self) -> ChatState {
        ChatState::capture(&self.store, self.condition.as_ref(), self.memory.as_ref())
    }

    /// Transcript entries over the full timeline.
    pub fn transcribe(&self, assistant_only: bool) -> Vec<TranscriptEntry> {
        if assistant_only {
            self.store.transcribe(Message::is_assistant)
        } else {
            self.store.transcribe(|_| true)
        }
    }

    // ── Requests ─────────────────────────────────────────────────────────

    /// Whether history has reached the compression trigger.
    pub fn needs_compression(&self) -> bool {
        self.compressor.should_compress(&self.store)
    }

    /// Summarize and archive the current history.
    pub async fn compress(&mut self) -> Result<Compression, CompressionError> {
        let outcome = self
            .compressor
            .compress(&mut self.store, self.condition.as_ref(), self.provider.as_ref())
            .await?;
        let cost = (!outcome.is_skipped())
            .then(|| self.costs.record(&outcome.usage.unwrap_or_default(), &self.model));
        Ok(Compression { outcome, cost })
    }

    /// Compress if the trigger is reached, then send the prompt.
    pub async fn prompt_cycle(&mut self, input: &str) -> Exchange {
        let compression = if self.needs_compression() {
            let result = self.compress().await;
            if let Err(e) = &result {
                warn!(error = %e, "compression failed, composing from current history");
            }
            Some(result)
        } else {
            None
        };
        Exchange {
            compression,
            reply: self.submit_prompt(input).await,
        }
    }

    /// Send a prompt and commit it with the reply.
    ///
    /// Reconciliation departs from charging the whole reported
    /// `prompt_tokens` to the new user message: that count also covers the
    /// condition, memory and included history, which already carry their own
    /// estimates. The user message is charged only the remainder, and the
    /// reply is charged `completion_tokens`.
    async fn submit_prompt(&mut self, input: &str) -> Result<Reply, SessionError> {
        let pending = Message::user(input)?;
        let composed = self.composer.compose_with_pending(
            self.store.history(),
            &pending,
            self.condition.as_ref(),
            self.memory.as_ref(),
        );
        if composed.included == 0 {
            let reserved = composed.tokens;
            return Err(SessionError::PromptTooLarge {
                tokens: pending.tokens(),
                budget: self.budget().saturating_sub(reserved),
            });
        }

        if composed.is_truncated() {
            debug!(
                included = composed.included,
                excluded = composed.excluded,
                "older history left out of request"
            );
        }

        let completion = self
            .provider
            .complete(&composed.messages)
            .await
            .inspect_err(|e| warn!(category = e.category(), error = %e, "completion failed"))?;
        if let Some(limits) = &completion.rate_limits {
            debug!(
                requests_remaining = ?limits.requests_remaining,
                tokens_remaining = ?limits.tokens_remaining,
                tokens_reset = ?limits.tokens_reset,
                "rate limits"
            );
        }

        let context_tokens = composed.tokens - u64::from(pending.tokens());
        let reply = Message::assistant(completion.content.clone())?;
        self.store.push(pending);
        self.store.push(reply);

        if let Some(usage) = completion.usage {
            // The prompt count covers the whole request; the new user message
            // is charged only the part not already accounted for.
            let context = u32::try_from(context_tokens).unwrap_or(u32::MAX);
            let attributed =
                TokenUsage::new(usage.prompt_tokens.saturating_sub(context), usage.completion_tokens);
            let drift = self.store.reconcile_last(&attributed);
            debug!(drift, "reconciled latest exchange");
        }

        let cost = self.costs.record(&completion.usage_or_default(), &self.model);
        Ok(Reply {
            content: completion.content,
            cost,
            usage: completion.usage,
            excluded: composed.excluded,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use assert_matches::assert_matches;
    use colloquy_context::constants::{SUMMARY_INSTRUCTION, SUMMARY_PREFIX};
    use colloquy_core::{ChatMessage, Role};
    use colloquy_llm::{Completion, RequestResult};
    use colloquy_tokens::lookup_model;

    // -- Scripted provider --

    #[derive(Clone, Default)]
    struct Script {
        replies: Arc<Mutex<VecDeque<RequestResult<Completion>>>>,
        requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl Script {
        fn reply(self, content: &str, usage: Option<TokenUsage>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Ok(Completion::new(content, usage)));
            self
        }

        fn fail(self) -> Self {
            self.replies.lock().unwrap().push_back(Err(RequestError::Api {
                status: 500,
                message: "boom".into(),
                code: None,
                retryable: true,
            }));
            self
        }

        fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    struct ScriptedProvider(Script);

    #[async_trait::async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> RequestResult<Completion> {
            self.0.requests.lock().unwrap().push(messages.to_vec());
            self.0
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RequestError::Other { message: "script exhausted".into() }))
        }
    }

    fn session(script: &Script, input_max_tokens: Option<u32>, reserve: u32) -> ChatSession {
        let settings = ModelSettings {
            name: "gpt-3.5-turbo".into(),
            input_max_tokens,
            response_reserve: reserve,
        };
        ChatSession::new(
            lookup_model("gpt-3.5-turbo").unwrap(),
            &settings,
            Box::new(ScriptedProvider(script.clone())),
        )
    }

    // -- budget --

    #[test]
    fn budget_uses_model_window_minus_reserve() {
        let script = Script::default();
        assert_eq!(session(&script, None, 600).budget(), 4096 - 600);
        assert_eq!(session(&script, Some(1000), 600).budget(), 400);
        assert_eq!(session(&script, Some(100), 600).budget(), 0);
    }

    // -- submit_prompt --

    #[tokio::test]
    async fn prompt_commits_user_and_reply() {
        let script = Script::default().reply("Hello there.", Some(TokenUsage::new(2, 3)));
        let mut session = session(&script, None, 600);

        let reply = session.submit_prompt("hello world").await.unwrap();

        assert_eq!(reply.content, "Hello there.");
        assert_eq!(reply.excluded, 0);
        let history = session.store().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[1].content(), "Hello there.");
        // Reconciled: prompt 2 with no prior context, completion 3.
        assert_eq!(history[0].tokens(), 2);
        assert_eq!(history[1].tokens(), 3);
        assert!(reply.cost.request > 0.0);
    }

    #[tokio::test]
    async fn request_includes_condition_and_memory_first() {
        let script = Script::default().reply("ok", None);
        let mut session = session(&script, None, 600);
        session.set_condition(Some(Condition::with_tokens("Terse", "Be terse.", 3)));
        session.set_memory("Ada is the hero.").unwrap();

        let _ = session.submit_prompt("Who is the hero?").await.unwrap();

        let sent = &script.requests()[0];
        let contents: Vec<&str> = sent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Be terse.", "Ada is the hero.", "Who is the hero?"]);
        // Condition and memory never enter history.
        assert_eq!(session.store().len(), 2);
    }

    #[tokio::test]
    async fn failed_request_leaves_store_unchanged() {
        let script = Script::default().reply("first", None).fail();
        let mut session = session(&script, None, 600);
        let _ = session.submit_prompt("one").await.unwrap();
        let before = session.store().clone();

        let err = session.submit_prompt("two").await.unwrap_err();

        assert_matches!(err, SessionError::Request(RequestError::Api { status: 500, .. }));
        assert_eq!(session.store(), &before);
    }

    #[tokio::test]
    async fn empty_prompt_is_encoding_error() {
        let script = Script::default();
        let mut session = session(&script, None, 600);
        assert_matches!(session.submit_prompt("").await, Err(SessionError::Encoding(_)));
        assert!(script.requests().is_empty());
    }

    #[tokio::test]
    async fn oversized_prompt_is_rejected_without_request() {
        let script = Script::default();
        let mut session = session(&script, Some(602), 600);
        let err = session
            .submit_prompt("this prompt is far longer than two tokens")
            .await
            .unwrap_err();
        assert_matches!(err, SessionError::PromptTooLarge { budget: 2, .. });
        assert!(script.requests().is_empty());
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn missing_usage_costs_nothing() {
        let script = Script::default().reply("ok", None);
        let mut session = session(&script, None, 600);
        let reply = session.submit_prompt("hi").await.unwrap();
        assert!(reply.usage.is_none());
        assert!(reply.cost.request.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn older_history_is_windowed_out() {
        let script = Script::default().reply("ok", None);
        let mut session = session(&script, Some(650), 600);
        session.restore(RestoredChat {
            store: MessageStore::load_messages(
                Vec::new(),
                vec![
                    Message::with_tokens(Role::User, "old question", 40),
                    Message::with_tokens(Role::Assistant, "old answer", 15),
                ],
            ),
            condition: None,
            memory: None,
        });

        let reply = session.submit_prompt("new").await.unwrap();
        assert_eq!(reply.excluded, 1);
        let sent: Vec<String> = script.requests()[0].iter().map(|m| m.content.clone()).collect();
        assert_eq!(sent, ["old answer", "new"]);
    }

    // -- compression --

    #[tokio::test]
    async fn compression_is_costed_and_archives() {
        let script = Script::default().reply("They talked.", Some(TokenUsage::new(100, 10)));
        let mut session = session(&script, Some(700), 600);
        session.restore(RestoredChat {
            store: MessageStore::load_messages(
                Vec::new(),
                vec![
                    Message::with_tokens(Role::User, "q", 60),
                    Message::with_tokens(Role::Assistant, "a", 60),
                ],
            ),
            condition: None,
            memory: None,
        });
        assert!(session.needs_compression());

        let compression = session.compress().await.unwrap();

        assert_eq!(compression.outcome.archived, 2);
        assert!(compression.cost.is_some());
        assert_eq!(session.store().archive().len(), 2);
        assert!(!session.needs_compression());
    }

    #[tokio::test]
    async fn failed_compression_keeps_history() {
        let script = Script::default().fail();
        let mut session = session(&script, Some(700), 600);
        session.restore(RestoredChat {
            store: MessageStore::load_messages(
                Vec::new(),
                vec![Message::with_tokens(Role::User, "q", 200)],
            ),
            condition: None,
            memory: None,
        });

        assert!(session.compress().await.is_err());
        assert_eq!(session.store().len(), 1);
        assert!(session.store().archive().is_empty());
        assert!(session.session_cost().abs() < f64::EPSILON);
    }

    // -- prompt_cycle --

    fn over_threshold(session: &mut ChatSession) {
        session.restore(RestoredChat {
            store: MessageStore::load_messages(
                Vec::new(),
                vec![
                    Message::with_tokens(Role::User, "q", 60),
                    Message::with_tokens(Role::Assistant, "a", 60),
                ],
            ),
            condition: None,
            memory: None,
        });
    }

    #[tokio::test]
    async fn cycle_compresses_before_composing() {
        let script = Script::default()
            .reply("They talked.", Some(TokenUsage::new(100, 10)))
            .reply("Go on then.", None);
        let mut session = session(&script, Some(700), 600);
        over_threshold(&mut session);

        let exchange = session.prompt_cycle("continue").await;

        let compression = exchange.compression.unwrap().unwrap();
        assert_eq!(compression.outcome.archived, 2);
        assert_eq!(exchange.reply.unwrap().content, "Go on then.");

        let requests = script.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].last().unwrap().content, SUMMARY_INSTRUCTION);
        let sent: Vec<&str> = requests[1].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(sent, [format!("{SUMMARY_PREFIX}They talked.").as_str(), "continue"]);

        assert_eq!(session.store().archive().len(), 2);
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.request_count(), 2);
    }

    #[tokio::test]
    async fn cycle_below_threshold_skips_compression() {
        let script = Script::default().reply("ok", None);
        let mut session = session(&script, None, 600);

        let exchange = session.prompt_cycle("hi").await;

        assert!(exchange.compression.is_none());
        assert!(exchange.reply.is_ok());
        assert_eq!(script.requests().len(), 1);
    }

    #[tokio::test]
    async fn cycle_sends_prompt_after_failed_compression() {
        let script = Script::default().fail().reply("ok", None);
        let mut session = session(&script, Some(700), 600);
        over_threshold(&mut session);

        let exchange = session.prompt_cycle("continue").await;

        assert_matches!(exchange.compression, Some(Err(CompressionError::Request(_))));
        let reply = exchange.reply.unwrap();
        assert_eq!(reply.excluded, 1);
        let sent: Vec<String> = script.requests()[1].iter().map(|m| m.content.clone()).collect();
        assert_eq!(sent, ["a", "continue"]);
        assert!(session.store().archive().is_empty());
        assert_eq!(session.store().len(), 4);
    }

    // -- memory / snapshot --

    #[test]
    fn clear_memory_drops_note() {
        let script = Script::default();
        let mut session = session(&script, None, 600);
        session.set_memory("remember this").unwrap();
        session.clear_memory();
        assert!(session.memory().is_none());
        session.clear_memory();
        assert!(session.memory().is_none());
    }

    #[test]
    fn blank_memory_clears_note() {
        let script = Script::default();
        let mut session = session(&script, None, 600);
        session.set_memory("remember this").unwrap();
        assert!(session.memory().is_some());
        session.set_memory("   ").unwrap();
        assert!(session.memory().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let script = Script::default();
        let mut session = session(&script, None, 600);
        session.set_condition(Some(Condition::new("Terse", "Be terse.").unwrap()));
        session.set_memory("note").unwrap();

        let restored = session.snapshot().restore().unwrap();
        assert_eq!(restored.condition.as_ref(), session.condition());
        assert_eq!(restored.memory.as_ref(), session.memory());
    }
}
