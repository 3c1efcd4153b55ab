mod config;
mod gemini;
mod models;
mod orchestrator;
mod pdf;
mod prompt;
mod routes;
mod schema;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::routes::AppState;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    if config.is_demo() {
        tracing::warn!("GEMINI_API_KEY not set, running in demo mode with canned strategies and placeholder images");
    } else {
        let shown: String = config.api_key.chars().take(6).collect();
        tracing::info!("Using API key: {}...", shown);
    }
    tracing::info!(
        strategy_model = %config.strategy_model,
        image_model = %config.image_model,
        strategy_timeout_secs = config.timeouts.strategy.as_secs(),
        image_timeout_secs = config.timeouts.image.as_secs(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "Gemini configuration loaded"
    );

    let gemini = Arc::new(GeminiClient::new(&config));
    let state = AppState::new(gemini.clone(), gemini, config.timeouts);
    tokio::spawn(routes::sweep_sessions(state.clone(), config.session_ttl));
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
