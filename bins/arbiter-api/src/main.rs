mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use arbiter_common::config::JudgeConfig;
use arbiter_judge::engine::LocalBackend;
use arbiter_judge::Judge;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub judge: Judge,
    /// Backs the raw stdin route, which bypasses harness generation
    pub local: LocalBackend,
    pub script_timeout: Duration,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Arbiter API booting...");

    let config = JudgeConfig::from_env();
    let judge = Judge::from_config(&config).context("Failed to configure judge")?;
    info!("Loaded language configurations for: {:?}", judge.languages().list_languages());

    let local = LocalBackend::new(
        judge.languages().clone(),
        Duration::from_millis(config.local_compile_timeout_ms),
    );

    let state = Arc::new(AppState {
        judge,
        local,
        script_timeout: Duration::from_millis(config.default_time_limit_ms),
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let listener = TcpListener::bind(&config.api_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_addr))?;

    info!("HTTP server listening on {}", config.api_addr);
    info!("Remote execution service: {}", config.piston_url);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
