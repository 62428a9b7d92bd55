use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use gateway::config::AppConfig;
use gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    info!(
        upstream = %config.fastapi_url,
        max_file_mb = config.max_file_mb,
        origins = ?config.allowed_origins,
        "phase45-gateway starting"
    );

    let state = Arc::new(AppState::new(config.clone())?);
    let app = gateway::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
