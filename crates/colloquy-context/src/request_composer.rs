//! Token-budgeted request composition.
//!
//! ## Algorithm
//!
//! 1. Reserve the condition and memory tokens.
//! 2. Walk history from newest to oldest, including each message while
//!    `reserved + window + message <= budget`. The first message that does
//!    not fit stops the walk; older messages are never swapped in for newer
//!    ones.
//! 3. Restore chronological order and prepend `[condition, memory]`.
//!
//! Inclusion is all-or-nothing per message. The result is the maximal
//! chronological suffix of history within the budget.
//!
//! If the condition and memory alone exceed the budget, memory is dropped
//! first and then the condition, so the bound always holds.

use std::iter;

use colloquy_core::{ChatMessage, Condition, Message};
use tracing::{debug, warn};

/// The ordered request plus accounting for what was left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedRequest {
    /// Messages to submit, in order.
    pub messages: Vec<ChatMessage>,
    /// History messages included in the window.
    pub included: usize,
    /// Older history messages left out of the window.
    pub excluded: usize,
    /// Estimated tokens of `messages`.
    pub tokens: u64,
    /// Whether the condition was submitted.
    pub condition_included: bool,
    /// Whether the memory note was submitted.
    pub memory_included: bool,
}

impl ComposedRequest {
    /// Whether any history was left out.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.excluded > 0
    }
}

/// Builds in-budget requests from history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestComposer {
    max_input_tokens: u64,
}

impl RequestComposer {
    /// Create a composer for a fixed input budget.
    #[must_use]
    pub fn new(max_input_tokens: u64) -> Self {
        Self { max_input_tokens }
    }

    /// Input budget in tokens.
    #[must_use]
    pub fn max_input_tokens(&self) -> u64 {
        self.max_input_tokens
    }

    /// Compose a request from `history`.
    #[must_use]
    pub fn compose(
        &self,
        history: &[Message],
        condition: Option<&Condition>,
        memory: Option<&Message>,
    ) -> ComposedRequest {
        self.compose_from(history.iter(), history.len(), condition, memory)
    }

    /// Compose a request from `history` followed by a not-yet-committed
    /// message.
    #[must_use]
    pub fn compose_with_pending(
        &self,
        history: &[Message],
        pending: &Message,
        condition: Option<&Condition>,
        memory: Option<&Message>,
    ) -> ComposedRequest {
        self.compose_from(
            history.iter().chain(iter::once(pending)),
            history.len() + 1,
            condition,
            memory,
        )
    }

    fn compose_from<'a, I>(
        &self,
        timeline: I,
        total: usize,
        condition: Option<&Condition>,
        memory: Option<&Message>,
    ) -> ComposedRequest
    where
        I: DoubleEndedIterator<Item = &'a Message>,
    {
        let budget = self.max_input_tokens;
        let (condition, memory) = self.fit_reserved(condition, memory);
        let reserved = condition.map_or(0, |c| u64::from(c.tokens()))
            + memory.map_or(0, |m| u64::from(m.tokens()));

        let mut window: Vec<&Message> = Vec::new();
        let mut used = 0u64;
        for message in timeline.rev() {
            let tokens = u64::from(message.tokens());
            if reserved + used + tokens > budget {
                break;
            }
            used += tokens;
            window.push(message);
        }
        window.reverse();

        let mut messages = Vec::with_capacity(window.len() + 2);
        if let Some(condition) = condition {
            messages.push(condition.to_chat_message());
        }
        if let Some(memory) = memory {
            messages.push(memory.to_chat_message());
        }
        messages.extend(window.iter().map(|m| m.to_chat_message()));

        let composed = ComposedRequest {
            messages,
            included: window.len(),
            excluded: total - window.len(),
            tokens: reserved + used,
            condition_included: condition.is_some(),
            memory_included: memory.is_some(),
        };
        debug!(
            budget,
            reserved,
            tokens = composed.tokens,
            included = composed.included,
            excluded = composed.excluded,
            "composed request"
        );
        composed
    }

    /// Drop memory, then the condition, until the reserved tokens fit.
    fn fit_reserved<'c, 'm>(
        &self,
        condition: Option<&'c Condition>,
        memory: Option<&'m Message>,
    ) -> (Option<&'c Condition>, Option<&'m Message>) {
        let budget = self.max_input_tokens;
        let condition_tokens = condition.map_or(0, |c| u64::from(c.tokens()));
        let memory_tokens = memory.map_or(0, |m| u64::from(m.tokens()));

        if condition_tokens + memory_tokens <= budget {
            return (condition, memory);
        }
        if memory.is_some() {
            warn!(memory_tokens, budget, "memory note exceeds input budget, omitting it");
        }
        if condition_tokens <= budget {
            return (condition, None);
        }
        if let Some(condition) = condition {
            warn!(
                condition = condition.name(),
                condition_tokens,
                budget,
                "condition exceeds input budget, omitting it"
            );
        }
        (None, None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
