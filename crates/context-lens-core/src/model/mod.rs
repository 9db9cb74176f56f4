//! Hosted model abstraction.
//!
//! The [`ModelClient`] trait is the single outbound seam of the assembler:
//! one `generate` call takes a system instruction, ordered role/text turns,
//! and optional tool declarations, and returns the reply text plus an
//! optional function call and search grounding.
//!
//! Wire types serialize in the generative-language REST shape
//! (`{"role": "user", "parts": [{"text": "..."}]}`), so the same values
//! are sent upstream and shown in the context record.
//!
//! Implementations must be `Send + Sync`. The HTTP implementation lives in
//! the application crate; [`scripted::ScriptedModel`] serves tests.

pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{GroundingChunk, Message, Role};

/// Role of a turn sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
    /// Carries a function response back to the model.
    Function,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Model => TurnRole::Model,
        }
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }
}

/// The application's answer to a [`FunctionCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// One part of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// One turn of model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(TurnRole::User, text)
    }
}

/// Convert a transcript into model turns, skipping typing placeholders.
pub fn build_history(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .filter(|m| !m.is_typing)
        .map(|m| Content::text(m.role.into(), m.text.clone()))
        .collect()
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// OpenAPI-style schema of the arguments object.
    pub parameters: Value,
}

/// Marker for the hosted web-search tool; serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSearch {}

/// A tool made available to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelTool {
    FunctionDeclarations(Vec<FunctionDeclaration>),
    GoogleSearch(GoogleSearch),
}

/// Everything sent in one `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub contents: Vec<Content>,
    pub tools: Vec<ModelTool>,
}

/// What the model returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Concatenated text parts; empty when the reply is only a function call.
    pub text: String,
    /// First function call in the reply, if any.
    pub function_call: Option<FunctionCall>,
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall::new(name, args)),
            ..Default::default()
        }
    }

    pub fn with_grounding(mut self, chunks: Vec<GroundingChunk>) -> Self {
        self.grounding_chunks = chunks;
        self
    }
}

/// A hosted generative model.
///
/// Errors (network, quota, malformed response, timeout) are returned as
/// [`LensError`](crate::LensError) and are never retried by callers.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_wire_shape() {
        let content = Content::user("hello");
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({ "role": "user", "parts": [{ "text": "hello" }] })
        );
    }

    #[test]
    fn test_function_parts_wire_shape() {
        let call = Part::FunctionCall(FunctionCall::new("code_interpreter", json!({ "code": "1+1" })));
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({ "functionCall": { "name": "code_interpreter", "args": { "code": "1+1" } } })
        );
        let resp = Part::FunctionResponse(FunctionResponse {
            name: "code_interpreter".into(),
            response: json!({ "result": 2 }),
        });
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({ "functionResponse": { "name": "code_interpreter", "response": { "result": 2 } } })
        );
    }

    #[test]
    fn test_tool_wire_shape() {
        let search = ModelTool::GoogleSearch(GoogleSearch {});
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({ "googleSearch": {} })
        );
    }

    #[test]
    fn test_build_history_skips_typing() {
        let mut typing = Message::model("", 2);
        typing.is_typing = true;
        let messages = vec![Message::user("hi", 0), Message::model("hello", 1), typing];
        let history = build_history(&messages);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1], Content::text(TurnRole::Model, "hello"));
    }

    #[test]
    fn test_function_call_non_object_args() {
        let call = FunctionCall::new("x", json!("not an object"));
        assert!(call.args.is_empty());
    }
}
