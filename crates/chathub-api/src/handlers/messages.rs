//! Message handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use chathub_core::types::MessageId;
use chathub_entity::message::Message;
use chathub_realtime::SendMessage;

use crate::dto::response::{ApiResponse, ReceiptResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SendMessage>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), ApiError> {
    let message = state.engine.router.send(auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

/// POST /api/messages/{id}/delivered
pub async fn mark_delivered(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, ApiError> {
    let message = state.engine.router.mark_delivered(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ReceiptResponse {
        updated: message.is_some(),
        message,
    })))
}

/// POST /api/messages/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<Json<ApiResponse<ReceiptResponse>>, ApiError> {
    let message = state.engine.router.mark_read(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ReceiptResponse {
        updated: message.is_some(),
        message,
    })))
}
