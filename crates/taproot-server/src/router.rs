//! Axum router setup for the taproot server

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::handle_panic;
use crate::handlers::{health, impact, node, not_found, rebuild, search};
use crate::ServerState;

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/impact", get(impact))
        .route("/node", get(node))
        .route("/rebuild", post(rebuild))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        // the dashboard is served from elsewhere
        .layer(CorsLayer::permissive())
        .with_state(state)
}
