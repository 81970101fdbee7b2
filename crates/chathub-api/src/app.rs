//! Application builder: wires router, middleware and state into an Axum app.

use axum::Router;
use axum::middleware as axum_middleware;
use tower_http::trace::TraceLayer;

use crate::middleware::compression::{build_body_limit_layer, build_compression_layer};
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    let body_limit = build_body_limit_layer(state.config.server.max_body_bytes);

    build_router(state)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(body_limit)
        .layer(build_compression_layer())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
