mod bootstrap;
mod health;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parley_core::config::{AppConfig, LoadOptions};

use crate::routes::AppState;

fn init_logging(config: &AppConfig) {
    use parley_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let state = AppState {
        orchestrator: Arc::clone(&app.orchestrator),
        accounts: Arc::clone(&app.accounts),
    };
    let router = routes::router(state).merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "parley-server started"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!(event_name = "system.server.stopping", "parley-server stopping");
    let _ = shutdown_tx.send(());

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined.context("server task panicked")?.context("server terminated")?,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                grace_secs = app.config.server.graceful_shutdown_secs,
                "in-flight requests did not drain before the shutdown deadline"
            );
        }
    }

    app.db_pool.close().await;

    Ok(())
}
