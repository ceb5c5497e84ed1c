//! Local token estimation.
//!
//! Token counts are estimated with the GPT-2/GPT-3 byte-pair encoding
//! (`r50k_base`). The estimate is reconciled later against the usage the
//! completion service reports, so exact vendor parity is not required.
//!
//! If the encoder tables fail to load, counting degrades to a
//! characters-per-token heuristic rather than failing the caller.

use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Approximate characters per token for the fallback heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

static ENCODER: LazyLock<Option<CoreBPE>> = LazyLock::new(|| match tiktoken_rs::r50k_base() {
    Ok(bpe) => Some(bpe),
    Err(error) => {
        warn!(%error, "r50k encoder unavailable, falling back to character heuristic");
        None
    }
});

/// Count the tokens in `text`.
///
/// Empty text counts as zero; callers that require content enforce that
/// themselves (see [`crate::Message::new`]).
#[must_use]
pub fn count_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    match ENCODER.as_ref() {
        Some(bpe) => saturating_u32(bpe.encode_ordinary(text).len()),
        None => estimate_from_chars(text),
    }
}

/// Character-based estimate: `ceil(chars / CHARS_PER_TOKEN)`.
#[must_use]
pub fn estimate_from_chars(text: &str) -> u32 {
    saturating_u32(text.chars().count().div_ceil(CHARS_PER_TOKEN))
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
