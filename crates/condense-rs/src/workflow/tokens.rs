//! Token estimation for budget checks and splitting.
//!
//! Uses a fixed chars-per-token ratio rather than a real tokenizer. The
//! estimate only has to be consistent between the splitter, the map-stage
//! short-circuit, and the length validator — all three measure with the
//! same ruler, so budget comparisons stay coherent even when the absolute
//! count drifts from the provider's tokenizer.

/// Approximate characters per token for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text fragment. Pure, no state.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}
