use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use sheen_core::gateway::{CompletionGateway, RoutineRequest, RoutineResponse};

use super::method_not_allowed;
use crate::error::{ApiError, INVALID_PRODUCTS};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/generate-routine",
        post(generate_routine).fallback(method_not_allowed),
    )
}

async fn generate_routine(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RoutineResponse>, ApiError> {
    let request = serde_json::from_slice::<RoutineRequest>(&body)
        .ok()
        .filter(|r| !r.product_data.is_empty())
        .ok_or_else(|| ApiError::bad_request(INVALID_PRODUCTS))?;

    let llm = state.llm.as_ref().ok_or_else(ApiError::not_configured)?;

    let routine = llm.generate_routine(&request).await.map_err(|e| {
        tracing::error!("routine completion failed: {e}");
        ApiError::internal(format!("Failed to generate routine: {e}"))
    })?;

    tracing::info!(products = request.product_data.len(), "routine relayed");
    Ok(Json(RoutineResponse { routine }))
}
