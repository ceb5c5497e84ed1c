//! Session cost accumulation.

use colloquy_core::TokenUsage;
use tracing::debug;

use crate::pricing::calculate_cost;
use crate::types::{ModelInfo, RequestCost};

/// Accumulates per-request cost into a session total.
///
/// The total only grows; there is no reset during a process lifetime.
#[derive(Clone, Debug, Default)]
pub struct CostTracker {
    session_cost: f64,
    requests: u64,
}

impl CostTracker {
    /// Create a tracker with zero cost.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request's usage and return its cost plus the new total.
    pub fn record(&mut self, usage: &TokenUsage, model: &ModelInfo) -> RequestCost {
        let request = calculate_cost(usage, model);
        self.session_cost += request;
        self.requests += 1;
        debug!(
            model = %model.name,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            request,
            session = self.session_cost,
            "recorded request cost"
        );
        RequestCost {
            usage: *usage,
            request,
            session: self.session_cost,
        }
    }

    /// Cumulative session cost.
    #[must_use]
    pub fn session_cost(&self) -> f64 {
        self.session_cost
    }

    /// Number of recorded requests.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::lookup_model;
    use proptest::prelude::*;

    #[test]
    fn new_tracker_is_zero() {
        let tracker = CostTracker::new();
        assert!(tracker.session_cost().abs() < f64::EPSILON);
        assert_eq!(tracker.request_count(), 0);
    }

    #[test]
    fn record_accumulates() {
        let model = lookup_model("gpt-3.5-turbo").unwrap();
        let mut tracker = CostTracker::new();

        let first = tracker.record(&TokenUsage::new(200, 850), &model);
        assert!((first.request - 0.002).abs() < 1e-12);
        assert!((first.session - 0.002).abs() < 1e-12);

        let second = tracker.record(&TokenUsage::new(200, 850), &model);
        assert!((second.request - 0.002).abs() < 1e-12);
        assert!((second.session - 0.004).abs() < 1e-12);
        assert_eq!(tracker.request_count(), 2);
    }

    #[test]
    fn record_keeps_usage() {
        let model = lookup_model("gpt-4").unwrap();
        let mut tracker = CostTracker::new();
        let cost = tracker.record(&TokenUsage::new(3, 4), &model);
        assert_eq!(cost.usage, TokenUsage::new(3, 4));
    }

    proptest! {
        #[test]
        fn session_cost_is_sum_of_requests(
            usages in proptest::collection::vec((0u32..50_000, 0u32..50_000), 0..20)
        ) {
            let model = lookup_model("gpt-4").unwrap();
            let mut tracker = CostTracker::new();
            let mut expected = 0.0;
            let mut previous = 0.0;
            for (prompt, completion) in usages {
                let cost = tracker.record(&TokenUsage::new(prompt, completion), &model);
                expected += cost.request;
                prop_assert!(cost.session >= previous);
                previous = cost.session;
            }
            prop_assert!((tracker.session_cost() - expected).abs() < 1e-9);
        }
    }
}
