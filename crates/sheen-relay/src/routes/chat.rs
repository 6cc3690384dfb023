use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use sheen_core::gateway::{ChatRequest, ChatResponse, CompletionGateway};

use super::method_not_allowed;
use crate::error::{ApiError, INVALID_HISTORY};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat).fallback(method_not_allowed))
}

/// Body parsing is done by hand so a malformed or absent body is the same 400
/// as an empty history.
async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = serde_json::from_slice::<ChatRequest>(&body)
        .ok()
        .filter(|r| !r.conversation_history.is_empty())
        .ok_or_else(|| ApiError::bad_request(INVALID_HISTORY))?;

    let llm = state.llm.as_ref().ok_or_else(ApiError::not_configured)?;

    let response = llm
        .chat(&request.conversation_history)
        .await
        .map_err(|e| {
            tracing::error!("chat completion failed: {e}");
            ApiError::internal(format!("Failed to get chat response: {e}"))
        })?;

    tracing::info!(
        history = request.conversation_history.len(),
        "chat completion relayed"
    );
    Ok(Json(ChatResponse { response }))
}
