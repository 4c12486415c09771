//! Axum router construction.
//!
//! Assembles the `WebSocket` upgrade routes and the health endpoint into a
//! single [`Router`] with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /ws` -- `WebSocket` conversational surface
/// - `GET /ws/consciousness` -- alias of `/ws`
/// - `GET /health` -- liveness and connection count
///
/// CORS is configured to allow any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_consciousness))
        .route("/ws/consciousness", get(ws::ws_consciousness))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
