use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use triage_core::{DeskConfig, TriageDesk};
use triage_server::config::ServerConfig;
use triage_server::routes;
use triage_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("triage=info".parse()?))
        .with_target(false)
        .init();

    let server_config = ServerConfig::from_env()?;
    let desk_config = DeskConfig::from_env()?;

    let desk = TriageDesk::from_config(&desk_config)?;
    tracing::info!(model = %desk.model_name(), "Triage desk ready");

    let state = Arc::new(AppState {
        desk,
        api_key: server_config.api_key.clone(),
    });
    if state.api_key.is_none() {
        tracing::warn!("TRIAGE_API_KEY not set, mutating endpoints are unauthenticated");
    }

    let app = routes::app(state.clone());

    let addr = server_config.addr();
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = state.desk.persist_policy().await {
        tracing::error!(error = %e, "Failed to persist policy on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
