//! JSON HTTP server for browser front ends.
//!
//! Exposes the scenario catalog, the document catalog, and the per-turn
//! context assembler over a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/scenarios` | Scenario configs with prompts and suggestions |
//! | `GET`  | `/documents` | The document catalog |
//! | `POST` | `/respond` | Run one turn and return the reply with its context |
//!
//! # `POST /respond`
//!
//! ```json
//! { "scenario": "document", "conversation": [], "message": "What is the budget?" }
//! ```
//!
//! returns `{ "text": "...", "context": { "systemPrompt": "...", ... } }`.
//! `conversation` holds previous messages and may be omitted. It is re-sorted
//! by `seq`; messages without `seq` keep the order they were sent in.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502), `timeout` (504),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use context_lens_core::assembler::Assembler;
use context_lens_core::catalog::{scenario_configs, ScenarioConfig};
use context_lens_core::conversation::Conversation;
use context_lens_core::model::ModelClient;
use context_lens_core::models::{ContextDetail, Document, Message, Scenario};
use context_lens_core::scoring::HybridScorer;
use context_lens_core::LensError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::{load_documents, Config};
use crate::gemini::create_client;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    assembler: Arc<Assembler>,
    client: Arc<dyn ModelClient>,
}

impl AppState {
    pub fn new(assembler: Assembler, client: Arc<dyn ModelClient>) -> Self {
        Self {
            assembler: Arc::new(assembler),
            client,
        }
    }

    /// Build state from configuration: catalog, retrieval depth and model client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let documents = load_documents(config)?;
        let assembler = Assembler::new(documents, HybridScorer::default(), config.retrieval.top_k);
        let client = create_client(&config.model)?;
        Ok(Self::new(assembler, client))
    }
}

/// Build the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/scenarios", get(handle_scenarios))
        .route("/documents", get(handle_documents))
        .route("/respond", post(handle_respond))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let bind_addr = config.server.bind.clone();

    info!(
        model = state.client.model_name(),
        documents = state.assembler.documents().len(),
        top_k = state.assembler.top_k(),
        "starting server"
    );
    if !config.model.is_enabled() {
        warn!("model provider is disabled, POST /respond will answer 502");
    }

    let app = router(state);

    println!("Context Lens listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"timeout"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<LensError> for AppError {
    fn from(err: LensError) -> Self {
        let (status, code) = match &err {
            LensError::UnknownScenario(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            LensError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            LensError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            LensError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /scenarios, GET /documents ============

#[derive(Serialize)]
struct ScenarioListResponse {
    scenarios: &'static [ScenarioConfig],
}

async fn handle_scenarios() -> Json<ScenarioListResponse> {
    Json(ScenarioListResponse {
        scenarios: scenario_configs(),
    })
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<Document>,
}

async fn handle_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    Json(DocumentListResponse {
        documents: state.assembler.documents().to_vec(),
    })
}

// ============ POST /respond ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondRequest {
    scenario: String,
    #[serde(default)]
    conversation: Vec<Message>,
    message: String,
}

#[derive(Serialize)]
struct RespondResponse {
    text: String,
    context: ContextDetail,
}

/// Handler for `POST /respond`.
///
/// Returns `400` for a malformed body, unknown scenario or empty message,
/// `502` when the model call fails and `504` when it times out.
async fn handle_respond(
    State(state): State<AppState>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<RespondResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let scenario: Scenario = req.scenario.parse()?;
    let conversation = Conversation::from_messages(scenario, req.conversation);

    let reply = state
        .assembler
        .respond(
            state.client.as_ref(),
            conversation.scenario(),
            conversation.messages(),
            &req.message,
        )
        .await
        .map_err(|e| {
            warn!(scenario = %scenario, error = %e, "respond failed");
            AppError::from(e)
        })?;

    Ok(Json(RespondResponse {
        text: reply.text,
        context: reply.context,
    }))
}
