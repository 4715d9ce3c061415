//! LLM Guardrail REST API Server

use anyhow::Context;
use llm_guardrail_api::config::{AppConfig, LogFormat};
use llm_guardrail_api::{create_router_with_config, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

const QUOTA_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let state = AppState::from_config(&config)
        .context("failed to initialise guardrail engine")?
        .with_metrics(metrics);

    let engine = state.engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(QUOTA_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            let pruned = engine.quota().prune_expired();
            if pruned > 0 {
                tracing::debug!(pruned, "expired quota windows dropped");
            }
        }
    });

    let app = create_router_with_config(state, &config.server);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("LLM Guardrail API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Validator catalog: http://{}/v1/validators", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
