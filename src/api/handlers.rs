//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse, HealthResponse, ModelsResponse};
use super::{AppState, PROVIDER};
use crate::conversation::{
    LoopConfig, Opening, Participant, RoundRobin, TerminalReason, TurnLoop,
};
use crate::responders::LlmResponder;
use crate::tools::{Tool, WebSearchTool};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

const AGENT_ID: &str = "agent";
const USER_ID: &str = "user";
/// The user's opening plus one reply
const CHAT_MAX_TURNS: u32 = 2;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/models", get(list_models))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<String>, AppError> {
    if !req.model_provider.eq_ignore_ascii_case(PROVIDER) {
        return Err(AppError::Rejected(format!(
            "Unsupported model provider: {}",
            req.model_provider
        )));
    }
    let Some(llm) = state.llm_registry.get(&req.model_name) else {
        return Err(AppError::Rejected(format!(
            "Invalid model name. Choose one of: {}",
            state.llm_registry.available_models().join(", ")
        )));
    };

    let query = req
        .messages
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if query.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }

    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    if req.allow_search {
        let Some(search) = state.search.clone() else {
            return Err(AppError::BadRequest(
                "Web search requested but TAVILY_API_KEY is not configured".to_string(),
            ));
        };
        tools.push(Arc::new(WebSearchTool::new(search)));
    }

    let system_prompt = match req.system_prompt.trim() {
        "" => DEFAULT_SYSTEM_PROMPT,
        prompt => prompt,
    };
    let agent = Participant::new(
        AGENT_ID,
        system_prompt,
        Arc::new(LlmResponder::new(
            llm,
            system_prompt,
            state.max_completion_tokens,
        )),
    )
    .with_capabilities(tools);

    let config = LoopConfig::from_defaults(CHAT_MAX_TURNS, state.loop_defaults);
    let turn_loop = TurnLoop::new(vec![agent], RoundRobin::without_repeat(), config)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(
        conv_id = %turn_loop.conversation_id(),
        model = %req.model_name,
        allow_search = req.allow_search,
        "Chat request"
    );

    let outcome = turn_loop
        .run(Some(Opening::new(USER_ID, query)))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    match &outcome.reason {
        TerminalReason::ResponderError { message, .. } => {
            return Err(AppError::Upstream(message.clone()));
        }
        reason if !reason.is_success() => {
            return Err(AppError::Internal(reason.to_string()));
        }
        _ => {}
    }

    outcome
        .transcript
        .into_iter()
        .rev()
        .find(|m| m.sender.as_str() == AGENT_ID)
        .map(|m| Json(m.content))
        .ok_or_else(|| AppError::Internal("agent produced no reply".to_string()))
}

// ============================================================
// Model info and health
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        provider: PROVIDER.to_string(),
        models: state.llm_registry.available_models(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    /// Reported with 200 and an `error` body, which the front-end shows as-is
    Rejected(String),
    BadRequest(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Rejected(msg) => (StatusCode::OK, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Chat request failed");
        }
        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
