mod config;
mod db;
mod proposer;
mod publish;
mod scheduler;
mod server;
mod types;

use crate::config::AppConfig;
use crate::db::ScheduleStore;
use crate::proposer::GeminiProposer;
use crate::types::ServerState;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    let config = if Path::new(&config_path).exists() {
        AppConfig::load_from_file(Path::new(&config_path))
            .map_err(|e| anyhow::anyhow!("Failed to load config from {config_path}: {e}"))?
    } else {
        info!("No config file at {config_path}, using defaults");
        AppConfig::default()
    };

    let store = ScheduleStore::new(&config.db_path);
    let proposer = GeminiProposer::from_settings(config.proposer.clone())
        .context("Failed to build proposer client")?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(ServerState {
        store,
        proposer: Box::new(proposer),
        config,
    });

    let router = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    info!("Listening on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {e}");
        return;
    }
    info!("Shutdown signal received");
}
