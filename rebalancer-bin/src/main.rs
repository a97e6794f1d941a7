//! Binary runner for the portfolio rebalancer.
//!
//! Loads configuration from the environment (and `.env`), wires the process
//! runner into the portfolio actions and serves the HTTP API until ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use rebalancer_http_api::{RebalancerApiState, build_router};
use rebalancer_runtime::{PortfolioActions, ProcessRunner, RebalancerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    // ── 1. Configuration ────────────────────────────────────────────────────
    let config = RebalancerConfig::from_env();
    tracing::info!(config = ?config, "Loaded configuration");
    if config.rpc_url.is_none() {
        tracing::warn!("BASE_SEPOLIA_RPC_URL not set; requests must supply rpcUrl");
    }
    if config.private_key.is_none() {
        tracing::warn!("PRIVATE_KEY not set; write endpoints will fail");
    }
    let port = config.port;

    // ── 2. Actions + router ─────────────────────────────────────────────────
    let actions = PortfolioActions::new(Arc::new(config), Arc::new(ProcessRunner));
    let router = build_router(Arc::new(RebalancerApiState::new(actions)));

    // ── 3. Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("HTTP API bind failed on port {port}"))?;
    tracing::info!("Portfolio rebalancer listening on 0.0.0.0:{port}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP API server error")?;

    tracing::info!("Portfolio rebalancer stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {}
}
