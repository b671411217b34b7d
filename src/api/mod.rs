//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::ledger::LedgerEngine;
use crate::provisioning::ProvisioningService;

pub use routes::create_router;

/// Services shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerEngine>,
    pub provisioning: Arc<ProvisioningService>,
}

impl AppState {
    pub fn new(ledger: LedgerEngine, provisioning: ProvisioningService) -> Self {
        Self {
            ledger: Arc::new(ledger),
            provisioning: Arc::new(provisioning),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Axum layers run last-added first: context -> logging -> handler
    let api_routes = create_router()
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
