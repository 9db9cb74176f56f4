//! Core data models shared by the retrieval pipeline, the assembler, and
//! the application surfaces.
//!
//! All wire-facing types serialize with camelCase field names so the JSON
//! produced here can be handed to a browser front end unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LensError;

/// One of the four fixed conversational modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Normal,
    Data,
    Search,
    Document,
}

impl Scenario {
    /// Every scenario, in display order.
    pub const ALL: [Scenario; 4] = [
        Scenario::Normal,
        Scenario::Data,
        Scenario::Search,
        Scenario::Document,
    ];

    /// Stable identifier used in URLs, config, and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Data => "data",
            Scenario::Search => "search",
            Scenario::Document => "document",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Scenario::Normal),
            "data" => Ok(Scenario::Data),
            "search" => Ok(Scenario::Search),
            "document" => Ok(Scenario::Document),
            other => Err(LensError::UnknownScenario(other.to_string())),
        }
    }
}

/// A static catalog entry available to the document scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A sentence-level excerpt of a [`Document`].
///
/// Recomputed on every retrieval call; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub text: String,
    /// Position of the originating document in the catalog.
    pub source_index: usize,
    pub source_title: String,
}

/// Relevance breakdown for one chunk. `total == keyword + semantic`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub keyword: u32,
    pub semantic: u32,
    pub total: u32,
}

impl Score {
    pub fn new(keyword: u32, semantic: u32) -> Self {
        Self {
            keyword,
            semantic,
            total: keyword + semantic,
        }
    }
}

/// A [`Chunk`] with its hybrid score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: Score,
}

/// A top-ranked [`ScoredChunk`] handed to the model and shown to the user.
pub type RetrievedChunk = ScoredChunk;

/// A web source referenced by the model's search grounding metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub web: WebSource,
    /// Simulated snippet; the model never returns snippet text itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of a transcript.
///
/// `id` is opaque. Ordering uses `seq`, which is assigned monotonically by
/// [`Conversation`](crate::conversation::Conversation).
///
/// Transcripts from older clients may omit `id`, `seq` and `createdAt`.
/// Missing `seq` values are 0, so such transcripts keep arrival order
/// under the stable sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "new_message_id")]
    pub id: String,
    #[serde(default)]
    pub seq: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextDetail>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_typing: bool,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>, seq: u64) -> Self {
        Self {
            id: new_message_id(),
            seq,
            created_at: Utc::now(),
            role,
            text: text.into(),
            context: None,
            is_typing: false,
        }
    }

    pub fn user(text: impl Into<String>, seq: u64) -> Self {
        Self::new(Role::User, text, seq)
    }

    pub fn model(text: impl Into<String>, seq: u64) -> Self {
        Self::new(Role::Model, text, seq)
    }

    pub fn with_context(mut self, context: ContextDetail) -> Self {
        self.context = Some(context);
        self
    }
}

/// Everything given to the model to produce one reply, with a token
/// estimate for each populated field.
///
/// Built once per model response and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDetail {
    pub system_prompt: String,
    pub system_prompt_token_count: usize,
    pub history: Vec<Message>,
    pub history_token_count: usize,
    pub user_message: String,
    pub user_message_token_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_definitions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_definitions_token_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_token_count: Option<usize>,
    /// True when `tool_call` was reconstructed client-side rather than
    /// issued by the model (search and document scenarios).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tool_call_simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_token_count: Option<usize>,

    pub response_text: String,
    pub response_token_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_chunks: Option<Vec<RetrievedChunk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_grounding: Option<Vec<GroundingChunk>>,
}

impl ContextDetail {
    /// Sum of every token estimate in the record.
    pub fn total_tokens(&self) -> usize {
        self.system_prompt_token_count
            + self.history_token_count
            + self.user_message_token_count
            + self.tool_definitions_token_count.unwrap_or(0)
            + self.tool_call_token_count.unwrap_or(0)
            + self.tool_result_token_count.unwrap_or(0)
            + self.response_token_count
    }
}
