//! Pluggable relevance scoring for document retrieval.
//!
//! A [`HybridScorer`] sums two [`Scorer`] strategies: a lexical one
//! (reported as the `keyword` component) and a secondary one (reported as
//! the `semantic` component). The built-in pair is:
//!
//! - [`KeywordOverlap`]: how many distinct query words occur in the chunk.
//! - [`TriggerTable`]: a hand-curated table mapping trigger words to
//!   regular expressions tuned to the demo catalog. It stands in for a
//!   real embedding similarity and is not a general semantic matcher.
//!
//! Any other strategy (for example cosine similarity over embeddings,
//! quantized to an integer) can replace either side without touching the
//! retrieval pipeline.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Chunk, Score, ScoredChunk};

// Word characters are ASCII only; accented letters are dropped like punctuation.
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_\s]").expect("non-word pattern is valid"));

/// Lower-case, drop non-word/non-space characters, split on whitespace.
fn normalize_words(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(&text.to_lowercase(), "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// A pre-processed retrieval query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The query text as given.
    pub text: String,
    /// Distinct normalized words, in first-seen order.
    pub terms: Vec<String>,
}

impl Query {
    pub fn parse(text: &str) -> Self {
        let mut seen = HashSet::new();
        let terms = normalize_words(text)
            .into_iter()
            .filter(|word| seen.insert(word.clone()))
            .collect();
        Self {
            text: text.to_string(),
            terms,
        }
    }
}

/// A relevance strategy: `(query, chunk text) → non-negative score`.
pub trait Scorer: Send + Sync {
    /// Short identifier, e.g. `"keyword"`.
    fn name(&self) -> &str;

    fn score(&self, query: &Query, chunk_text: &str) -> u32;
}

/// Counts query terms present in the chunk's word set.
///
/// Each query term contributes at most 1 regardless of how often it
/// appears in the chunk.
pub struct KeywordOverlap;

impl Scorer for KeywordOverlap {
    fn name(&self) -> &str {
        "keyword"
    }

    fn score(&self, query: &Query, chunk_text: &str) -> u32 {
        let words: HashSet<String> = normalize_words(chunk_text).into_iter().collect();
        query.terms.iter().filter(|t| words.contains(*t)).count() as u32
    }
}

/// Trigger word → pattern table. Adds 1 for each query term that is a
/// trigger whose pattern matches the lower-cased chunk text.
pub struct TriggerTable {
    triggers: Vec<(String, Regex)>,
}

/// Trigger patterns tuned to the built-in catalog.
const DEMO_TRIGGERS: &[(&str, &str)] = &[
    ("budget", r"\$\d+(\.\d+)?\s*million"),
    ("cost", r"\$\d+(\.\d+)?\s*million"),
    ("money", r"\$\d+(\.\d+)?\s*million"),
    ("engineer", r"dr\. evelyn reed"),
    ("manager", r"david chen"),
    ("leader", r"dr\. evelyn reed|david chen"),
    ("when", r"august 15th|october 3rd|september 1st|q2 2024"),
    ("where", r"lisbon, portugal"),
    ("offsite", r"lisbon, portugal"),
];

impl TriggerTable {
    /// Build a table from `(trigger, pattern)` pairs. Patterns are
    /// compiled case-insensitively.
    pub fn new(entries: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let triggers = entries
            .iter()
            .map(|(word, pattern)| {
                Regex::new(&format!("(?i){}", pattern)).map(|re| (word.to_lowercase(), re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { triggers })
    }

    /// The table matching the built-in document catalog.
    pub fn demo() -> Self {
        static DEMO: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
            TriggerTable::new(DEMO_TRIGGERS)
                .expect("demo trigger patterns are valid")
                .triggers
        });
        Self {
            triggers: DEMO.clone(),
        }
    }
}

impl Scorer for TriggerTable {
    fn name(&self) -> &str {
        "trigger"
    }

    fn score(&self, query: &Query, chunk_text: &str) -> u32 {
        let text = chunk_text.to_lowercase();
        query
            .terms
            .iter()
            .filter(|term| {
                self.triggers
                    .iter()
                    .any(|(word, re)| word == *term && re.is_match(&text))
            })
            .count() as u32
    }
}

/// Lexical + secondary scorer whose components are summed.
pub struct HybridScorer {
    lexical: Box<dyn Scorer>,
    semantic: Box<dyn Scorer>,
}

impl HybridScorer {
    pub fn new(lexical: Box<dyn Scorer>, semantic: Box<dyn Scorer>) -> Self {
        Self { lexical, semantic }
    }

    pub fn score(&self, query: &Query, chunk_text: &str) -> Score {
        Score::new(
            self.lexical.score(query, chunk_text),
            self.semantic.score(query, chunk_text),
        )
    }

    pub fn score_chunk(&self, query: &Query, chunk: Chunk) -> ScoredChunk {
        let score = self.score(query, &chunk.text);
        ScoredChunk { chunk, score }
    }

    /// `"{lexical}+{semantic}"`, e.g. `"keyword+trigger"`.
    pub fn describe(&self) -> String {
        format!("{}+{}", self.lexical.name(), self.semantic.name())
    }
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::new(Box::new(KeywordOverlap), Box::new(TriggerTable::demo()))
    }
}
