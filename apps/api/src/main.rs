//! # StockConnect API Server
//!
//! Startup and shutdown order:
//! ```text
//! .env ─► tracing ─► ApiConfig ─► Database (migrations) ─► EventHub
//!      ─► SideEffectWorker (spawned) ─► axum::serve
//!
//! SIGINT/SIGTERM ─► stop accepting requests ─► drain side-effect queue
//!                ─► close the pool
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stockconnect_api::{build_router, ApiConfig, AppState};
use stockconnect_db::Database;
use stockconnect_notify::{EventHub, LogDispatcher, LowStockNotifier, SideEffectWorker};

const DEFAULT_LOG_FILTER: &str = "info,stockconnect=debug,sqlx=warn,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    info!("Starting StockConnect API server...");

    let config = Arc::new(ApiConfig::load()?);
    info!(
        addr = %config.socket_addr(),
        database = %config.database_path.display(),
        allow_negative_stock = config.allow_negative_stock,
        verify_order_total = config.verify_order_total,
        cancellation_mode = %config.cancellation_mode,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config())
        .await
        .context("failed to open database")?;

    let notify_config = config.notify_config();
    notify_config.validate()?;
    let notify_config = Arc::new(notify_config);

    let hub = EventHub::new(notify_config.event_capacity);
    let notifier = LowStockNotifier::new(db.clone(), Arc::new(LogDispatcher), notify_config.clone());
    let (worker, queue, worker_handle) =
        SideEffectWorker::new(notifier, hub.clone(), notify_config.queue_capacity);
    let worker_task = tokio::spawn(worker.run());

    let state = AppState::new(db.clone(), queue, hub, config.clone());
    let app = build_router(state);

    let listener = TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;
    info!(addr = %config.socket_addr(), "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, draining side effects");
    if let Err(e) = worker_handle.shutdown().await {
        warn!(error = %e, "Side-effect worker already stopped");
    }
    if let Err(e) = worker_task.await {
        warn!(error = %e, "Side-effect worker task failed");
    }

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
