//! Per-scenario context assembly.
//!
//! Every scenario runs the same skeleton ([`assemble`]):
//!
//! 1. Convert the transcript into model turns.
//! 2. Let the scenario hook [`prepare`](ScenarioHook::prepare) the user
//!    turn (the document scenario injects retrieved excerpts here).
//! 3. Call the model once with the scenario's system prompt and
//!    [`tools`](ScenarioHook::tools).
//! 4. Let the hook [`interpret`](ScenarioHook::interpret) the response
//!    (the data scenario may run its tool and call the model again).
//! 5. Package every input and output into a [`ContextDetail`] with a
//!    token estimate per populated field.
//!
//! # Data scenario state machine
//!
//! ```text
//! Start ──call──▶ no code_interpreter call ──────────────▶ Done
//!   │
//!   └──▶ ExecuteTool ──ok──▶ Callback (second call) ─────▶ Done
//!              │
//!              └──err──▶ Fail (fixed error reply, no second call)
//! ```
//!
//! Tool execution errors are never sent to the model for narration.
//! Upstream model errors propagate to the caller unchanged.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::catalog::{default_documents, scenario_config};
use crate::conversation::Conversation;
use crate::error::Result;
use crate::expr::evaluate_json;
use crate::model::{
    build_history, Content, FunctionDeclaration, FunctionResponse, GenerateRequest, GoogleSearch,
    ModelClient, ModelResponse, ModelTool, Part, TurnRole,
};
use crate::models::{
    ContextDetail, Document, GroundingChunk, Message, RetrievedChunk, Scenario,
};
use crate::query::reduce_query;
use crate::retrieval::{format_excerpts, rag_prompt, retrieve, DEFAULT_TOP_K};
use crate::scoring::HybridScorer;
use crate::snippet::simulate_snippet;
use crate::tokens::{estimate_json_tokens, estimate_tokens};

/// Name of the calculation tool offered in the data scenario.
pub const CODE_INTERPRETER: &str = "code_interpreter";
/// Name shown for the simulated web-search invocation.
pub const GOOGLE_SEARCH: &str = "google_search";
/// Name shown for the simulated document retrieval invocation.
pub const DOCUMENT_RETRIEVAL: &str = "document_retrieval_tool";

/// Declaration of the `code_interpreter` function.
pub fn code_interpreter_tool() -> ModelTool {
    ModelTool::FunctionDeclarations(vec![FunctionDeclaration {
        name: CODE_INTERPRETER.to_string(),
        description: "Executes simple, single-line Python code to answer a question that requires a calculation. The code must be a simple expression that returns a value.".to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "code": {
                    "type": "STRING",
                    "description": "The single-line Python expression to execute. e.g., '150 / 3' or '3.14 * (5**2)'"
                }
            },
            "required": ["code"]
        }),
    }])
}

/// Reply used instead of a second model call when the tool fails.
pub fn tool_error_reply(message: &str) -> String {
    format!(
        "An error occurred while executing the code:\n```\n{}\n```\nPlease check the context for more details.",
        message
    )
}

/// The reply text and the context that produced it.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub context: ContextDetail,
}

/// Pre-call output of a [`ScenarioHook`].
#[derive(Debug, Clone, Default)]
pub struct Prepared {
    /// Text of the final user turn sent to the model.
    pub prompt: String,
    /// Client-side reconstruction of the tool invocation, if any.
    pub simulated_tool_call: Option<Value>,
    pub retrieved: Option<Vec<RetrievedChunk>>,
}

impl Prepared {
    /// Send the user's message as-is.
    pub fn message(user_message: &str) -> Self {
        Self {
            prompt: user_message.to_string(),
            ..Default::default()
        }
    }
}

/// Post-call output of a [`ScenarioHook`].
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub text: String,
    /// Tool invocation issued by the model itself.
    pub tool_call: Option<Value>,
    pub tool_result: Option<Value>,
    pub search_grounding: Option<Vec<GroundingChunk>>,
}

impl Outcome {
    pub fn text(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }
}

/// Scenario-specific steps plugged into [`assemble`].
#[async_trait]
pub trait ScenarioHook: Send + Sync {
    fn scenario(&self) -> Scenario;

    /// Tool declarations sent with every model call.
    fn tools(&self) -> Vec<ModelTool> {
        Vec::new()
    }

    /// Build the final user turn before the model is called.
    fn prepare(&self, user_message: &str) -> Prepared {
        Prepared::message(user_message)
    }

    /// Turn the model response into the reply. May call the model again.
    async fn interpret(
        &self,
        _client: &dyn ModelClient,
        _request: GenerateRequest,
        response: ModelResponse,
        _user_message: &str,
    ) -> Result<Outcome> {
        Ok(Outcome::text(response.text))
    }
}

/// Run one turn for `hook` and assemble its [`ContextDetail`].
pub async fn assemble<H: ScenarioHook + ?Sized>(
    client: &dyn ModelClient,
    hook: &H,
    conversation: &[Message],
    user_message: &str,
) -> Result<Reply> {
    let scenario = hook.scenario();
    let system_prompt = scenario_config(scenario).system_prompt.to_string();
    let history_turns = build_history(conversation);
    let prepared = hook.prepare(user_message);
    let tools = hook.tools();

    let mut contents = history_turns.clone();
    contents.push(Content::user(prepared.prompt.clone()));

    let request = GenerateRequest {
        system_instruction: system_prompt.clone(),
        contents,
        tools: tools.clone(),
    };

    debug!(
        scenario = %scenario,
        model = client.model_name(),
        turns = request.contents.len(),
        tools = request.tools.len(),
        "calling model"
    );
    let response = client.generate(&request).await?;
    let outcome = hook.interpret(client, request, response, user_message).await?;

    let tool_definitions = if tools.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&tools)?)
    };

    let (tool_call, tool_call_simulated) = match outcome.tool_call {
        Some(call) => (Some(call), false),
        None => {
            let simulated = prepared.simulated_tool_call.is_some();
            (prepared.simulated_tool_call, simulated)
        }
    };

    let tool_result_token_count = if let Some(result) = &outcome.tool_result {
        Some(estimate_json_tokens(result))
    } else if let Some(chunks) = &prepared.retrieved {
        Some(estimate_json_tokens(chunks))
    } else {
        outcome
            .search_grounding
            .as_ref()
            .map(|grounding| estimate_json_tokens(grounding))
    };

    let history: Vec<Message> = conversation
        .iter()
        .filter(|m| !m.is_typing)
        .cloned()
        .collect();

    let context = ContextDetail {
        system_prompt_token_count: estimate_tokens(&system_prompt),
        system_prompt,
        history,
        history_token_count: estimate_json_tokens(&history_turns),
        user_message: user_message.to_string(),
        user_message_token_count: estimate_tokens(user_message),
        tool_definitions_token_count: tool_definitions.as_ref().map(estimate_json_tokens),
        tool_definitions,
        tool_call_token_count: tool_call.as_ref().map(estimate_json_tokens),
        tool_call,
        tool_call_simulated,
        tool_result: outcome.tool_result,
        tool_result_token_count,
        response_token_count: estimate_tokens(&outcome.text),
        response_text: outcome.text.clone(),
        retrieved_chunks: prepared.retrieved,
        search_grounding: outcome.search_grounding,
    };

    Ok(Reply {
        text: outcome.text,
        context,
    })
}

/// Plain chat: system prompt, history, and message; no tools.
pub struct NormalChat;

impl ScenarioHook for NormalChat {
    fn scenario(&self) -> Scenario {
        Scenario::Normal
    }
}

/// Function calling against the `code_interpreter` tool.
pub struct DataAnalysis;

#[async_trait]
impl ScenarioHook for DataAnalysis {
    fn scenario(&self) -> Scenario {
        Scenario::Data
    }

    fn tools(&self) -> Vec<ModelTool> {
        vec![code_interpreter_tool()]
    }

    async fn interpret(
        &self,
        client: &dyn ModelClient,
        request: GenerateRequest,
        response: ModelResponse,
        _user_message: &str,
    ) -> Result<Outcome> {
        let call = match response.function_call {
            Some(call) if call.name == CODE_INTERPRETER => call,
            _ => return Ok(Outcome::text(response.text)),
        };
        let tool_call = serde_json::to_value(&call)?;

        let code = match call.args.get("code") {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let evaluation = match &code {
            Some(code) => evaluate_json(code).map_err(|e| e.to_string()),
            None => Err("missing required argument 'code'".to_string()),
        };

        let value = match evaluation {
            Ok(value) => value,
            Err(message) => {
                warn!(code = code.as_deref().unwrap_or(""), error = %message, "code_interpreter failed");
                return Ok(Outcome {
                    text: tool_error_reply(&message),
                    tool_call: Some(tool_call),
                    tool_result: Some(json!({ "error": message })),
                    search_grounding: None,
                });
            }
        };

        let payload = json!({ "result": value });
        debug!(code = code.as_deref().unwrap_or(""), result = %payload, "code_interpreter succeeded");

        let mut contents = request.contents;
        contents.push(Content {
            role: TurnRole::Model,
            parts: vec![Part::FunctionCall(call)],
        });
        contents.push(Content {
            role: TurnRole::Function,
            parts: vec![Part::FunctionResponse(FunctionResponse {
                name: CODE_INTERPRETER.to_string(),
                response: payload.clone(),
            })],
        });
        let follow_up = GenerateRequest {
            system_instruction: request.system_instruction,
            contents,
            tools: request.tools,
        };

        let final_response = client.generate(&follow_up).await?;

        Ok(Outcome {
            text: final_response.text,
            tool_call: Some(tool_call),
            tool_result: Some(payload),
            search_grounding: None,
        })
    }
}

/// Hosted web search with simulated snippets on the returned sources.
///
/// The displayed query is reconstructed from the user's message and is
/// independent of the sources the model actually grounded on.
pub struct WebSearch;

#[async_trait]
impl ScenarioHook for WebSearch {
    fn scenario(&self) -> Scenario {
        Scenario::Search
    }

    fn tools(&self) -> Vec<ModelTool> {
        vec![ModelTool::GoogleSearch(GoogleSearch {})]
    }

    fn prepare(&self, user_message: &str) -> Prepared {
        Prepared {
            simulated_tool_call: Some(json!({
                "name": GOOGLE_SEARCH,
                "args": { "query": reduce_query(user_message) }
            })),
            ..Prepared::message(user_message)
        }
    }

    async fn interpret(
        &self,
        _client: &dyn ModelClient,
        _request: GenerateRequest,
        response: ModelResponse,
        user_message: &str,
    ) -> Result<Outcome> {
        let grounding: Vec<GroundingChunk> = response
            .grounding_chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.snippet = Some(simulate_snippet(user_message, &chunk.web.title));
                chunk
            })
            .collect();

        Ok(Outcome {
            text: response.text,
            search_grounding: Some(grounding),
            ..Default::default()
        })
    }
}

/// Retrieval-augmented answers over the document catalog.
pub struct DocumentLibrary<'a> {
    pub documents: &'a [Document],
    pub scorer: &'a HybridScorer,
    pub top_k: usize,
}

impl ScenarioHook for DocumentLibrary<'_> {
    fn scenario(&self) -> Scenario {
        Scenario::Document
    }

    fn prepare(&self, user_message: &str) -> Prepared {
        let query = reduce_query(user_message);
        let retrieved = retrieve(self.documents, &query, self.scorer, self.top_k);
        debug!(query = %query, retrieved = retrieved.len(), "document retrieval");

        Prepared {
            prompt: rag_prompt(user_message, &format_excerpts(&retrieved)),
            simulated_tool_call: Some(json!({
                "name": DOCUMENT_RETRIEVAL,
                "args": { "query": query }
            })),
            retrieved: Some(retrieved),
        }
    }
}

/// Scenario dispatcher holding the document catalog and retrieval setup.
pub struct Assembler {
    documents: Vec<Document>,
    scorer: HybridScorer,
    top_k: usize,
}

impl Assembler {
    pub fn new(documents: Vec<Document>, scorer: HybridScorer, top_k: usize) -> Self {
        Self {
            documents,
            scorer,
            top_k,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn scorer(&self) -> &HybridScorer {
        &self.scorer
    }

    /// Run the document scenario's retrieval step alone.
    pub fn retrieve(&self, user_message: &str) -> Vec<RetrievedChunk> {
        retrieve(
            &self.documents,
            &reduce_query(user_message),
            &self.scorer,
            self.top_k,
        )
    }

    /// Produce the reply and context for one turn of `scenario`.
    pub async fn respond(
        &self,
        client: &dyn ModelClient,
        scenario: Scenario,
        conversation: &[Message],
        user_message: &str,
    ) -> Result<Reply> {
        match scenario {
            Scenario::Normal => assemble(client, &NormalChat, conversation, user_message).await,
            Scenario::Data => assemble(client, &DataAnalysis, conversation, user_message).await,
            Scenario::Search => assemble(client, &WebSearch, conversation, user_message).await,
            Scenario::Document => {
                let hook = DocumentLibrary {
                    documents: &self.documents,
                    scorer: &self.scorer,
                    top_k: self.top_k,
                };
                assemble(client, &hook, conversation, user_message).await
            }
        }
    }

    /// Run a turn and record it in `conversation`.
    ///
    /// The user message is appended before the call. On failure the
    /// generic failure reply is appended and the error returned.
    pub async fn converse<'c>(
        &self,
        client: &dyn ModelClient,
        conversation: &'c mut Conversation,
        user_message: &str,
    ) -> Result<&'c Message> {
        let history = conversation.messages().to_vec();
        conversation.push_user(user_message);

        match self
            .respond(client, conversation.scenario(), &history, user_message)
            .await
        {
            Ok(reply) => Ok(conversation.push_model(&reply.text, Some(reply.context))),
            Err(err) => {
                warn!(scenario = %conversation.scenario(), error = %err, "turn failed");
                conversation.push_failure();
                Err(err)
            }
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(default_documents(), HybridScorer::default(), DEFAULT_TOP_K)
    }
}
