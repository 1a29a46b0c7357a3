//! muster-server - snapshot store and report notifications
//!
//! Listens for snapshot syncs and push subscriptions from the scanning
//! clients, and pushes the in/out report Sunday-Thursday 22:30 and
//! Saturday/Sunday 02:00 in the configured time zone.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use muster_common::config::RootFolderInitializer;
use muster_common::logging::init_tracing;
use muster_server::config::{Args, ServerConfig};
use muster_server::push::WebPushSender;
use muster_server::scheduler::NotificationScheduler;
use muster_server::{build_router, AppState, BackendStore};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_source) = ServerConfig::load(&args).context("Failed to load configuration")?;

    init_tracing(&config.logging).context("Failed to initialise logging")?;
    config_source.log();
    info!(
        "Starting muster-server v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr()
    );

    let timezone = config.parse_timezone()?;
    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("Invalid allowed_origin '{}'", config.allowed_origin))?;

    let initializer = RootFolderInitializer::new(config.resolve_root_folder(&args));
    initializer.ensure_directory_exists()?;

    let store = Arc::new(BackendStore::load(initializer.root()));

    let shutdown = CancellationToken::new();
    let scheduler_task = match &config.vapid_private_key {
        Some(key_path) => {
            let sender = WebPushSender::from_pem_file(key_path, &config.contact)
                .map_err(|e| anyhow::anyhow!("Failed to set up push delivery: {}", e))?;
            let public_key = sender
                .public_key()
                .map_err(|e| anyhow::anyhow!("Failed to derive VAPID public key: {}", e))?;
            info!("VAPID public key: {}", public_key);

            let scheduler = NotificationScheduler::new(store.clone(), Arc::new(sender), timezone);
            info!("Report schedule evaluated in {}", scheduler.timezone());
            Some(scheduler.spawn(shutdown.clone()))
        }
        None => {
            warn!("No vapid_private_key configured, scheduled notifications are disabled");
            None
        }
    };

    let state = AppState::new(store).with_allowed_origin(allowed_origin);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr()))?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Some(task) = scheduler_task {
        task.await.ok();
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
    shutdown.cancel();
}
