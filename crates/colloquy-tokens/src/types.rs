//! Pricing and cost types.

use colloquy_core::TokenUsage;
use serde::{Deserialize, Serialize};

/// Token limits and pricing for one model.
///
/// Costs are expressed per `token_denominator` tokens (1,000 for the
/// built-in table).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// API model identifier.
    pub name: String,
    /// Maximum input tokens the model accepts.
    pub max_tokens: u32,
    /// Cost per `token_denominator` prompt tokens.
    pub input_cost: f64,
    /// Cost per `token_denominator` completion tokens.
    pub output_cost: f64,
    /// Token count the costs are quoted against.
    pub token_denominator: u32,
}

impl ModelInfo {
    /// Create a model entry priced per 1,000 tokens.
    #[must_use]
    pub fn per_thousand(name: &str, max_tokens: u32, input_cost: f64, output_cost: f64) -> Self {
        Self {
            name: name.to_string(),
            max_tokens,
            input_cost,
            output_cost,
            token_denominator: 1_000,
        }
    }
}

/// Cost of one request and the running session total after it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequestCost {
    /// Usage the cost was computed from.
    pub usage: TokenUsage,
    /// Cost of this request.
    pub request: f64,
    /// Cumulative session cost including this request.
    pub session: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_thousand_sets_denominator() {
        let model = ModelInfo::per_thousand("gpt-4", 8192, 0.03, 0.06);
        assert_eq!(model.token_denominator, 1_000);
        assert_eq!(model.max_tokens, 8192);
    }

    #[test]
    fn model_info_camel_case() {
        let model = ModelInfo::per_thousand("gpt-4", 8192, 0.03, 0.06);
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["maxTokens"], 8192);
        assert_eq!(value["tokenDenominator"], 1000);
    }
}
