//! # colloquy-tokens
//!
//! Model registry and cost accounting for completion usage.
//!
//! 1. **Registry** — [`ModelInfo`] per supported model: context window and
//!    per-denominator input/output prices.
//! 2. **Cost calculation** — `(prompt * input + completion * output) / denominator`.
//! 3. **Tracking** — [`CostTracker`] accumulates session cost across requests
//!    and never resets during a process lifetime.

#![deny(unsafe_code)]

pub mod errors;
pub mod pricing;
pub mod tracker;
pub mod types;

pub use errors::{Result, TokenError};
pub use pricing::{calculate_cost, format_cost, format_tokens, lookup_model, models};
pub use tracker::CostTracker;
pub use types::{ModelInfo, RequestCost};
