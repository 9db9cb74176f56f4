//! Sentence-boundary document chunker.
//!
//! Splits each catalog [`Document`] into sentence-level [`Chunk`]s that
//! remember which document they came from.
//!
//! # Algorithm
//!
//! 1. Match `[^.!?]+[.!?]+` over the document content: a run of
//!    non-terminators followed by one or more of `.`, `!`, `?`.
//! 2. Trim each match and emit it as a chunk.
//! 3. If the content has no match at all (no terminal punctuation), emit
//!    the whole content as a single chunk.
//!
//! Text after the last terminator is not part of any match and is not
//! emitted. Abbreviations such as `Dr.` end a sentence.
//!
//! The chunk list is rebuilt on every retrieval call. That is fine for the
//! small static catalog; a larger corpus would memoize it per document.
//!
//! # Example
//!
//! ```rust
//! use context_lens_core::chunk::chunk_document;
//! use context_lens_core::models::Document;
//!
//! let doc = Document::new("Notes", "First point. Second point!");
//! let chunks = chunk_document(0, &doc);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].text, "Second point!");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Chunk, Document};

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern is valid"));

/// Split one document into sentence chunks tagged with `source_index`.
pub fn chunk_document(source_index: usize, doc: &Document) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = SENTENCE
        .find_iter(&doc.content)
        .map(|m| make_chunk(source_index, doc, m.as_str().trim()))
        .collect();

    if chunks.is_empty() {
        return vec![make_chunk(source_index, doc, &doc.content)];
    }

    chunks
}

/// Chunk every document in catalog order.
pub fn chunk_documents(docs: &[Document]) -> Vec<Chunk> {
    docs.iter()
        .enumerate()
        .flat_map(|(index, doc)| chunk_document(index, doc))
        .collect()
}

fn make_chunk(source_index: usize, doc: &Document, text: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        source_index,
        source_title: doc.title.clone(),
    }
}
