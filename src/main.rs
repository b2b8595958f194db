//! Product API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_api::{create_router, spawn_cleanup_task, AppState, Config, MemoryBackend, SqliteStore};

/// Main entry point for the Product API server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the database and apply migrations
/// 4. Create the cache backend and start the expiry sweeper
/// 5. Create Axum router with all endpoints
/// 6. Serve until SIGINT/SIGTERM, then close the pool
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "product_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        app = %config.app_name,
        version = %config.app_version,
        port = config.server_port,
        prefix = %config.api_prefix,
        cache_ttl_secs = config.cache_expire_time,
        cache_max_entries = config.cache_max_entries,
        "configuration loaded"
    );

    let store = SqliteStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to open database")?;
    store
        .migrate()
        .await
        .context("failed to apply database migrations")?;

    let backend = Arc::new(MemoryBackend::new(config.cache_max_entries));
    let cleanup_handle = spawn_cleanup_task(backend.clone(), config.cache_cleanup_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let state = AppState::from_config(Arc::new(store.clone()), backend, config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server terminated unexpectedly")?;

    store.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweeper.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cache expiry sweeper aborted");
}
