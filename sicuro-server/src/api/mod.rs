//! API Module
//!
//! HTTP API layer for the CI server.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod logs;
pub mod stream;
pub mod trigger;
pub mod webhook;

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use sicuro_runner::JobScheduler;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub scheduler: JobScheduler,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(scheduler: JobScheduler, config: ServerConfig) -> Self {
        Self {
            scheduler,
            config: Arc::new(config),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Triggers
        .route("/webhook/github", post(webhook::github_webhook))
        .route("/run", get(trigger::run))
        .route("/api/trigger", post(trigger::trigger))
        // Logs
        .route("/ci/{*path}", get(logs::get_log))
        .route("/ws/{*path}", get(stream::stream_log))
        .route(
            "/api/projects/{owner}/{repo}/logs",
            get(logs::list_project_logs),
        )
        .route(
            "/api/projects/{owner}/{repo}/ledger",
            get(logs::get_project_ledger),
        )
        // Add state and middleware
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(TraceLayer::new_for_http())
}
