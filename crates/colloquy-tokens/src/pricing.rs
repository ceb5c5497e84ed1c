//! Model registry and cost calculation.
//!
//! The built-in table covers the chat-completion models the client was
//! written against, priced per 1,000 tokens. Short aliases (`gpt-3.5`,
//! `gpt-3.5-16k`) resolve to their full API names.

use colloquy_core::TokenUsage;

use crate::errors::{Result, TokenError};
use crate::types::ModelInfo;

/// All built-in models.
#[must_use]
pub fn models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::per_thousand("gpt-3.5-turbo", 4_096, 0.0015, 0.002),
        ModelInfo::per_thousand("gpt-3.5-turbo-16k", 16_384, 0.003, 0.004),
        ModelInfo::per_thousand("gpt-4", 8_192, 0.03, 0.06),
        ModelInfo::per_thousand("gpt-4-32k", 32_768, 0.06, 0.12),
    ]
}

/// Look up a model by API name or short alias.
pub fn lookup_model(name: &str) -> Result<ModelInfo> {
    let canonical = match name {
        "gpt-3.5" => "gpt-3.5-turbo",
        "gpt-3.5-16k" => "gpt-3.5-turbo-16k",
        other => other,
    };
    models()
        .into_iter()
        .find(|model| model.name == canonical)
        .ok_or_else(|| TokenError::UnknownModel {
            model: name.to_string(),
        })
}

/// Cost of a request: `(prompt * input + completion * output) / denominator`.
#[must_use]
pub fn calculate_cost(usage: &TokenUsage, model: &ModelInfo) -> f64 {
    if model.token_denominator == 0 {
        return 0.0;
    }
    let prompt = f64::from(usage.prompt_tokens) * model.input_cost;
    let completion = f64::from(usage.completion_tokens) * model.output_cost;
    (prompt + completion) / f64::from(model.token_denominator)
}

/// Format a cost value for display with three decimal places.
#[must_use]
pub fn format_cost(cost: f64) -> String {
    format!("${cost:.3}")
}

/// Format a token count for display (e.g., `"1.5M"`, `"50K"`, `"500"`).
#[must_use]
#[allow(clippy::cast_precision_loss)] // Token counts never approach 2^52
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        let m = n as f64 / 1_000_000.0;
        if (m - m.round()).abs() < 0.05 {
            format!("{m:.0}M")
        } else {
            format!("{m:.1}M")
        }
    } else if n >= 1_000 {
        let k = n as f64 / 1_000.0;
        if (k - k.round()).abs() < 0.05 {
            format!("{k:.0}K")
        } else {
            format!("{k:.1}K")
        }
    } else {
        n.to_string()
    }
}
