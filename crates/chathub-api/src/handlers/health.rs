//! Health check handlers.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use chathub_core::config::StorageBackend;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let storage = match state.config.database.storage {
        StorageBackend::Postgres => "postgres",
        StorageBackend::Memory => "memory",
    };

    let database = match &state.database {
        Some(pool) => Some(pool.health_check().await.unwrap_or_else(|e| {
            warn!(error = %e, "Database health check failed");
            false
        })),
        None => None,
    };
    let status = if database == Some(false) { "degraded" } else { "ok" };

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        storage: storage.to_string(),
        database,
        ws_connections: state.engine.registry.connection_count(),
        online_users: state.engine.registry.user_count(),
        metrics: state.engine.metrics_snapshot(),
    }))
}
