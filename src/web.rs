//! Web server setup: router, CORS, listener

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{self, AppState};
use crate::config::PanelConfig;

pub async fn run(config: PanelConfig) -> Result<()> {
    let state = AppState::from_config(&config).context("Failed to build provider clients")?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(Arc::new(state)).layer(cors);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        "travel-panel API running at http://localhost:{}",
        config.server.port
    );
    axum::serve(listener, app).await?;
    Ok(())
}
