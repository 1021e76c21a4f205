mod age;
mod client;
mod config;
mod profile;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use client::ResidentClient;
use config::Config;
use server::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();
    let client = ResidentClient::new(&config)?;

    match config.reference_date {
        Some(date) => tracing::info!(%date, "ages computed against a fixed reference date"),
        None => tracing::info!("ages computed against today (UTC)"),
    }
    tracing::info!(base_url = %config.base_url, static_dir = %config.static_dir, "upstream configured");

    let listen = config.listen.clone();
    let state = Arc::new(AppState { config, client });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    tracing::info!("Server running: http://{listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            }
            tracing::info!("shutting down gracefully");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
