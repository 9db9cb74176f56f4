//! Stopword-filtered query reduction.
//!
//! Turns a free-text user message into the condensed search query shown as
//! the simulated tool invocation in the search and document scenarios, and
//! used as the retrieval query for the document scenario.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// English function words dropped from search queries.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing",
        "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
        "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most", "my",
        "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
        "our", "ours", "ourselves", "out", "over", "own", "s", "same", "she", "should", "so",
        "some", "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves",
        "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
        "until", "up", "very", "was", "we", "were", "what", "when", "where", "which", "while",
        "who", "whom", "why", "with", "would", "you", "your", "yours", "yourself",
        "yourselves", "tell", "summarize", "like",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `word` (already lower-cased) is a stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Reduce a user message to a condensed search query.
///
/// Lower-cases, removes `'s`, strips `? . ! ,`, splits on whitespace, and
/// drops stopwords. If nothing survives, the original message is returned
/// unchanged, so a non-empty input never yields an empty query.
///
/// ```rust
/// use context_lens_core::query::reduce_query;
///
/// assert_eq!(reduce_query("What's the weather in Tokyo?"), "weather tokyo");
/// assert_eq!(reduce_query("Tell me about it?"), "Tell me about it?");
/// ```
pub fn reduce_query(message: &str) -> String {
    let cleaned: String = message
        .to_lowercase()
        .replace("'s", "")
        .chars()
        .filter(|c| !matches!(c, '?' | '.' | '!' | ','))
        .collect();

    let query = cleaned
        .split_whitespace()
        .filter(|word| !is_stopword(word))
        .collect::<Vec<_>>()
        .join(" ");

    if query.is_empty() {
        message.to_string()
    } else {
        query
    }
}
