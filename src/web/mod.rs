//! HTTP server and REST API

pub mod api;

pub use api::AppState;

use api::{ask_rule_handler, health_handler, history_handler, stats_handler};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

/// Create the router for the retrieval service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ask_rule", get(ask_rule_handler))
        .route("/api/history", get(history_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
