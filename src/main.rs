//! zk-properties server entry point.
//!
//! Starts the Axum HTTP server exposing property sets under `/properties`.

use std::sync::Arc;

use anyhow::Context;

use zk_properties::api;
use zk_properties::app_state::AppState;
use zk_properties::config::{ServiceConfig, StorageBackend};
use zk_properties::logging;
use zk_properties::service::PropertyService;
use zk_properties::storage::{MemoryStorageFactory, StorageFactory, ZkStorageFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServiceConfig::from_env().context("invalid configuration")?;

    // Initialize tracing
    logging::init(config.log_format);
    tracing::info!(
        connect_string = %config.connect_string,
        root_path = %config.root_path,
        backend = ?config.storage_backend,
        "starting zk-properties"
    );

    // Build storage layer
    let factory: Arc<dyn StorageFactory> = match config.storage_backend {
        StorageBackend::ZooKeeper => Arc::new(ZkStorageFactory::new(
            config.connect_string.clone(),
            config.root_path.clone(),
            config.session_timeout,
        )),
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; property sets are lost on restart");
            Arc::new(MemoryStorageFactory::new())
        }
    };

    // Build application state and router
    let app_state = AppState::new(PropertyService::new(factory));
    let app = api::build_app(app_state, config.request_timeout);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
