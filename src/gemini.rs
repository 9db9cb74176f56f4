//! Hosted model client for the Gemini `generateContent` REST endpoint.
//!
//! # Request
//!
//! `POST {base_url}/models/{model}:generateContent` with the API key in the
//! `x-goog-api-key` header:
//!
//! ```json
//! {
//!   "systemInstruction": { "parts": [{ "text": "..." }] },
//!   "contents": [{ "role": "user", "parts": [{ "text": "..." }] }],
//!   "tools": [{ "googleSearch": {} }]
//! }
//! ```
//!
//! `tools` is omitted when the scenario declares none.
//!
//! # Response
//!
//! Only the first candidate is read: its text parts are concatenated, the
//! first `functionCall` part becomes [`ModelResponse::function_call`], and
//! `groundingMetadata.groundingChunks[].web` become grounding chunks.
//!
//! # Failure handling
//!
//! There are no retries. A request that exceeds `model.timeout_secs` fails
//! with [`LensError::Timeout`]; any other transport error, non-2xx status,
//! or malformed body fails with [`LensError::Upstream`].

use async_trait::async_trait;
use context_lens_core::model::{FunctionCall, GenerateRequest, ModelClient, ModelResponse};
use context_lens_core::models::{GroundingChunk, WebSource};
use context_lens_core::{LensError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ModelConfig;

/// [`ModelClient`] backed by the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Build a client from `[model]`, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &ModelConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} not set", config.api_key_env))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ModelConfig, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LensError {
        if err.is_timeout() {
            LensError::Timeout(self.timeout_secs)
        } else {
            LensError::Upstream(err.to_string())
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse> {
        let body = request_body(request)?;
        debug!(model = %self.model, turns = request.contents.len(), "POST generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LensError::Upstream(format!(
                "Gemini API error {}: {}",
                status, body_text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        parse_response(&json)
    }
}

/// Model client used when `model.provider = "disabled"`. Every call fails.
pub struct DisabledModel;

#[async_trait]
impl ModelClient for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<ModelResponse> {
        Err(LensError::Upstream("model provider is disabled".to_string()))
    }
}

/// Create the model client selected by `[model].provider`.
pub fn create_client(config: &ModelConfig) -> anyhow::Result<Arc<dyn ModelClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "gemini" => Ok(Arc::new(GeminiClient::from_config(config)?)),
        other => anyhow::bail!("Unknown model provider: '{}'", other),
    }
}

/// Serialize a [`GenerateRequest`] into the REST request body.
pub fn request_body(request: &GenerateRequest) -> Result<Value> {
    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
        "contents": serde_json::to_value(&request.contents)?,
    });
    if !request.tools.is_empty() {
        body["tools"] = serde_json::to_value(&request.tools)?;
    }
    Ok(body)
}

/// Parse a `generateContent` response body.
pub fn parse_response(json: &Value) -> Result<ModelResponse> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LensError::Upstream("Invalid Gemini response: no candidates".to_string()))?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    let function_call = parts
        .iter()
        .find_map(|p| p.get("functionCall"))
        .map(|call| {
            serde_json::from_value::<FunctionCall>(call.clone())
                .map_err(|e| LensError::Upstream(format!("Invalid Gemini response: {}", e)))
        })
        .transpose()?;

    let grounding_chunks = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(|g| g.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|c| c.get("web"))
                .map(|web| GroundingChunk {
                    web: serde_json::from_value::<WebSource>(web.clone()).unwrap_or_default(),
                    snippet: None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelResponse {
        text,
        function_call,
        grounding_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_lens_core::model::{Content, GoogleSearch, ModelTool};

    #[test]
    fn test_request_body_omits_empty_tools() {
        let request = GenerateRequest {
            system_instruction: "Be brief.".into(),
            contents: vec![Content::user("hi")],
            tools: vec![],
        };
        let body = request_body(&request).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_request_body_with_search_tool() {
        let request = GenerateRequest {
            system_instruction: String::new(),
            contents: vec![Content::user("news")],
            tools: vec![ModelTool::GoogleSearch(GoogleSearch {})],
        };
        let body = request_body(&request).unwrap();
        assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
    }

    #[test]
    fn test_parse_text_and_grounding() {
        let json = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "The " }, { "text": "Chiefs." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://nfl.com/x", "title": "nfl.com" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        });
        let response = parse_response(&json).unwrap();
        assert_eq!(response.text, "The Chiefs.");
        assert!(response.function_call.is_none());
        assert_eq!(response.grounding_chunks.len(), 1);
        assert_eq!(response.grounding_chunks[0].web.title, "nfl.com");
    }

    #[test]
    fn test_parse_function_call() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [
                    { "functionCall": { "name": "code_interpreter", "args": { "code": "3*4" } } }
                ] }
            }]
        });
        let response = parse_response(&json).unwrap();
        assert_eq!(response.text, "");
        let call = response.function_call.unwrap();
        assert_eq!(call.name, "code_interpreter");
        assert_eq!(call.args["code"], "3*4");
    }

    #[test]
    fn test_parse_malformed_function_call_is_upstream_error() {
        for call in [
            json!({ "name": "code_interpreter", "args": "2+2" }),
            json!({ "args": { "code": "2+2" } }),
            json!("code_interpreter"),
        ] {
            let json = json!({
                "candidates": [{ "content": { "parts": [{ "functionCall": call }] } }]
            });
            let err = parse_response(&json).unwrap_err();
            assert!(
                matches!(&err, LensError::Upstream(m) if m.starts_with("Invalid Gemini response")),
                "unexpected error: {:?}",
                err
            );
        }
    }

    #[test]
    fn test_parse_no_candidates() {
        let err = parse_response(&json!({ "promptFeedback": {} })).unwrap_err();
        assert!(matches!(err, LensError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_disabled_model_fails() {
        let request = GenerateRequest {
            system_instruction: String::new(),
            contents: vec![],
            tools: vec![],
        };
        let err = DisabledModel.generate(&request).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Upstream model error: model provider is disabled"
        );
    }

    #[test]
    fn test_create_client_disabled() {
        let config = ModelConfig {
            provider: "disabled".into(),
            ..Default::default()
        };
        let client = create_client(&config).unwrap();
        assert_eq!(client.model_name(), "disabled");
    }

    #[test]
    fn test_endpoint() {
        let config = ModelConfig {
            base_url: "http://localhost:9/v1beta/".into(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config, "key".into()).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
