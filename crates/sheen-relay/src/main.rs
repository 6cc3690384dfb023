use std::sync::Arc;

use anyhow::Result;
use sheen_core::config::SheenConfig;
use sheen_relay::{app, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sheen_relay=info,tower_http=info"));
    if std::env::var_os("SHEEN_LOG_JSON").is_some() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cwd = std::env::current_dir().ok();
    let config = SheenConfig::load(cwd.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        SheenConfig::default_config()
    });

    let addr = format!("{}:{}", config.relay.host, config.relay.port);
    let state = Arc::new(AppState::from_config(&config));
    tracing::info!(
        upstream_configured = state.llm.is_some(),
        "sheen-relay listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
