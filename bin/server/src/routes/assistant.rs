//! Conversational assistant routes.
//!
//! Authorization for individual tools is enforced inside the assistant's
//! dispatcher, not here; these routes only require an authenticated user.

use crate::auth::middleware::RequireUser;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use storefront_conversation::Message;

/// `/api/assistant` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/reset-session", post(reset_session))
        .route("/history/{session_id}", get(history))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_performed: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = state
        .assistant
        .chat(&request.session_id, &request.message, &user)
        .await;
    Json(ChatResponse {
        response: reply.response,
        session_id: reply.session_id,
        action_performed: reply.action_performed,
    })
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    status: &'static str,
    message: &'static str,
}

async fn reset_session(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Json(request): Json<ResetRequest>,
) -> Json<ResetResponse> {
    state.assistant.reset_session(&request.session_id).await;
    Json(ResetResponse {
        status: "success",
        message: "Session reset successfully",
    })
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    messages: Vec<Message>,
    count: usize,
}

async fn history(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(50);
    let messages = state.assistant.history(&session_id, limit).await;
    Json(HistoryResponse {
        count: messages.len(),
        session_id,
        messages,
    })
}
