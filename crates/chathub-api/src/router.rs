//! Route definitions for the ChatHub HTTP API.
//!
//! REST routes are mounted under `/api`; the socket upgrade lives at `/ws`.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Build the router with every route and the shared state.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(message_routes())
        .merge(call_routes())
        .merge(group_routes())
        .merge(notification_routes())
        .merge(presence_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .with_state(state)
}

/// Send and receipts
fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::messages::send_message))
        .route(
            "/messages/{id}/delivered",
            post(handlers::messages::mark_delivered),
        )
        .route("/messages/{id}/read", post(handlers::messages::mark_read))
        .route(
            "/conversations/{peer_id}/open",
            post(handlers::conversations::open_conversation),
        )
}

/// Call signalling
fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/calls", post(handlers::calls::initiate))
        .route("/calls/{id}", get(handlers::calls::get_call))
        .route("/calls/{id}/accept", post(handlers::calls::accept))
        .route("/calls/{id}/reject", post(handlers::calls::reject))
        .route("/calls/{id}/end", post(handlers::calls::end))
}

/// Group membership
fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups/{id}/join", post(handlers::groups::join))
        .route("/groups/{id}/leave", post(handlers::groups::leave))
}

/// Notification actions
fn notification_routes() -> Router<AppState> {
    Router::new().route(
        "/notifications/actions",
        post(handlers::notifications::perform_action),
    )
}

/// Presence lookup
fn presence_routes() -> Router<AppState> {
    Router::new().route("/presence/{user_id}", get(handlers::presence::get_status))
}

/// Health endpoints (no auth)
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
