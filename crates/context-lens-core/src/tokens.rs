//! Display-only token estimation.
//!
//! Uses a 4 chars ≈ 1 token heuristic. Counts are shown next to each
//! context section and are never used for budgeting.

use serde::Serialize;

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` as `ceil(chars / 4)`.
///
/// Empty text is `0`.
///
/// ```rust
/// use context_lens_core::tokens::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate the token count of a value's compact JSON encoding.
pub fn estimate_json_tokens<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_string(value)
        .map(|s| estimate_tokens(&s))
        .unwrap_or(0)
}
