//! Call signalling handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use chathub_core::types::CallId;
use chathub_entity::call::CallSession;

use crate::dto::request::InitiateCallRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

type CallResponse = Result<Json<ApiResponse<CallSession>>, ApiError>;

/// POST /api/calls
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<InitiateCallRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CallSession>>), ApiError> {
    let session = state
        .engine
        .calls
        .initiate(auth.user_id, req.recipient_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(session))))
}

/// GET /api/calls/{id}
pub async fn get_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CallId>,
) -> CallResponse {
    let session = state.engine.calls.get(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/calls/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CallId>,
) -> CallResponse {
    let session = state.engine.calls.accept(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/calls/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CallId>,
) -> CallResponse {
    let session = state.engine.calls.reject(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// POST /api/calls/{id}/end
pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CallId>,
) -> CallResponse {
    let session = state.engine.calls.end(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}
