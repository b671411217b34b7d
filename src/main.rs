//! banking_core - Money-movement ledger service
//!
//! Serves the ledger engine and provisioning over HTTP, backed by the
//! in-memory instrument store.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use banking_core::api::{self, AppState};
use banking_core::ledger::{InstrumentLocks, LedgerEngine};
use banking_core::notify::{LogNotifier, NotificationDispatcher};
use banking_core::provisioning::ProvisioningService;
use banking_core::store::{InMemoryStore, InstrumentStore};
use banking_core::{Config, LogFormat};

/// Initialize tracing/logging
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "banking_core=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        "Starting banking_core server"
    );

    let store: Arc<dyn InstrumentStore> = Arc::new(InMemoryStore::new());
    let (notifier, notifications) = NotificationDispatcher::spawn(
        Arc::new(LogNotifier),
        config.notification_queue_capacity,
    );

    let locks = Arc::new(InstrumentLocks::new());

    let state = AppState::new(
        LedgerEngine::new(store.clone(), locks.clone(), notifier, config.ledger_settings()),
        ProvisioningService::new(store, locks, config.provisioning_settings()),
    );

    tracing::info!("Listening on http://{}", addr);

    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last dispatcher handle; the worker drains and exits
    tracing::info!("Server shutting down, flushing notifications...");
    if let Err(e) = notifications.await {
        tracing::error!(error = %e, "Notification worker failed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
