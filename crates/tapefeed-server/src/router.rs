//! Axum router construction for the dashboard API.
//!
//! Assembles all routes (REST + WebSocket) into a single [`Router`] with
//! CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the dashboard server.
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Liveness
        .route("/health", get(handlers::health))
        // WebSocket feed
        .route("/ws", get(ws::ws_feed))
        // REST API
        .route("/api/v1/dashboard", get(handlers::dashboard))
        .route("/api/v1/orders", get(handlers::list_orders))
        .route("/api/v1/orders/{id}", get(handlers::get_order))
        .route("/api/v1/positions", get(handlers::list_positions))
        .route("/api/v1/positions/{id}", get(handlers::get_position))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
