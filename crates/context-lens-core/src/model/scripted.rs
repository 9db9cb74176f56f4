//! In-memory [`ModelClient`] for tests and offline demos.
//!
//! Responses are queued ahead of time and returned in order; every
//! request is recorded so tests can assert on what the assembler sent.
//! Uses `std::sync::Mutex` for thread safety.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{LensError, Result};

use super::{GenerateRequest, ModelClient, ModelResponse};

/// Scripted model that replays queued responses.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next call.
    pub fn push(&self, response: ModelResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a plain-text reply.
    pub fn push_text(&self, text: &str) -> &Self {
        self.push(ModelResponse::text(text))
    }

    /// Queue a failure for the next call.
    pub fn push_error(&self, err: LensError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LensError::Upstream("no scripted response queued".to_string())))
    }
}
