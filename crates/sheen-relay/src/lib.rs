pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::Router;
use sheen_core::config::SheenConfig;
use sheen_core::llm::CompletionClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    /// `None` when no credential resolved; completion routes then answer 500.
    pub llm: Option<CompletionClient>,
}

impl AppState {
    pub fn from_config(config: &SheenConfig) -> Self {
        let llm = match CompletionClient::from_config(&config.llm) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("{e}; /chat and /generate-routine will fail until a key is set");
                None
            }
        };
        Self { llm }
    }
}

/// The relay service with CORS and request tracing.
///
/// Every response carries `Access-Control-Allow-Origin: *`; any `OPTIONS`
/// request is answered by the CORS layer before routing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
