//! Document retrieval for the RAG scenario.
//!
//! # Pipeline
//!
//! 1. Chunk every catalog document into sentences ([`crate::chunk`]).
//! 2. Score each chunk against the query with a [`HybridScorer`].
//! 3. Stable-sort by `total` descending (ties keep catalog order).
//! 4. Drop chunks with `total == 0`.
//! 5. Keep the first `limit` (5 by default).
//!
//! An empty result is valid; [`format_excerpts`] renders it as
//! "No relevant document chunks found."

use crate::chunk::chunk_documents;
use crate::models::{Document, RetrievedChunk, ScoredChunk};
use crate::scoring::{HybridScorer, Query};

/// Default number of chunks handed to the model.
pub const DEFAULT_TOP_K: usize = 5;

/// Text used in place of excerpts when nothing scored above zero.
pub const NO_EXCERPTS: &str = "No relevant document chunks found.";

/// Score every chunk of `docs` against `query`, in catalog order.
pub fn score_chunks(docs: &[Document], query: &str, scorer: &HybridScorer) -> Vec<ScoredChunk> {
    let query = Query::parse(query);
    chunk_documents(docs)
        .into_iter()
        .map(|chunk| scorer.score_chunk(&query, chunk))
        .collect()
}

/// Order scored chunks and keep the top `limit` with a positive total.
///
/// The sort is stable, so chunks with equal totals keep their input order.
pub fn rank(mut scored: Vec<ScoredChunk>, limit: usize) -> Vec<RetrievedChunk> {
    scored.sort_by(|a, b| b.score.total.cmp(&a.score.total));
    scored
        .into_iter()
        .filter(|c| c.score.total > 0)
        .take(limit)
        .collect()
}

/// Run the full retrieval pipeline.
pub fn retrieve(
    docs: &[Document],
    query: &str,
    scorer: &HybridScorer,
    limit: usize,
) -> Vec<RetrievedChunk> {
    rank(score_chunks(docs, query, scorer), limit)
}

/// Render retrieved chunks as labeled excerpts separated by `---`.
pub fn format_excerpts(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_EXCERPTS.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "Snippet {} from \"{}\":\n{}",
                i + 1,
                c.chunk.source_title,
                c.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Wrap the user's question and the excerpts in the grounding prompt.
pub fn rag_prompt(user_message: &str, excerpts: &str) -> String {
    format!(
        "\nBased *only* on the document excerpts provided below, answer the following question.\nQuestion: \"{}\"\n\nExcerpts:\n---\n{}\n---\n",
        user_message, excerpts
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_documents;
    use crate::models::{Chunk, Score};

    fn scored(text: &str, total: u32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                source_index: 0,
                source_title: "T".to_string(),
            },
            score: Score::new(total, 0),
        }
    }

    #[test]
    fn test_rank_sorted_desc_and_positive() {
        let ranked = rank(
            vec![scored("a", 1), scored("b", 0), scored("c", 3), scored("d", 2)],
            5,
        );
        let texts: Vec<&str> = ranked.iter().map(|c| c.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "d", "a"]);
    }

    #[test]
    fn test_rank_stable_under_ties() {
        let ranked = rank(
            vec![scored("first", 2), scored("second", 2), scored("third", 2)],
            5,
        );
        let texts: Vec<&str> = ranked.iter().map(|c| c.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_limit() {
        let input: Vec<ScoredChunk> = (0..10).map(|i| scored(&i.to_string(), 1)).collect();
        assert_eq!(rank(input, DEFAULT_TOP_K).len(), 5);
    }

    #[test]
    fn test_retrieve_budget_question() {
        let docs = default_documents();
        let results = retrieve(
            &docs,
            "budget project nova",
            &HybridScorer::default(),
            DEFAULT_TOP_K,
        );
        assert!(!results.is_empty());
        assert!(results.len() <= DEFAULT_TOP_K);
        let top = &results[0];
        assert!(top.chunk.text.contains("$4 million"));
        assert_eq!(top.chunk.source_title, "Project Nova: Executive Summary");
        assert_eq!(top.score, Score::new(3, 1));
        for pair in results.windows(2) {
            assert!(pair[0].score.total >= pair[1].score.total);
        }
        for c in &results {
            assert!(c.score.total > 0);
            assert_eq!(c.score.total, c.score.keyword + c.score.semantic);
        }
    }

    #[test]
    fn test_retrieve_nothing_relevant() {
        let docs = default_documents();
        let results = retrieve(&docs, "zebra xylophone", &HybridScorer::default(), 5);
        assert!(results.is_empty());
        assert_eq!(format_excerpts(&results), NO_EXCERPTS);
    }

    #[test]
    fn test_format_excerpts_labels_and_separators() {
        let text = format_excerpts(&[scored("One.", 2), scored("Two.", 1)]);
        assert_eq!(text, "Snippet 1 from \"T\":\nOne.\n---\nSnippet 2 from \"T\":\nTwo.");
    }

    #[test]
    fn test_rag_prompt_embeds_question_and_excerpts() {
        let prompt = rag_prompt("Where is it?", NO_EXCERPTS);
        assert!(prompt.contains("Question: \"Where is it?\""));
        assert!(prompt.contains("---\nNo relevant document chunks found.\n---"));
        assert!(prompt.contains("Based *only* on the document excerpts"));
    }
}
