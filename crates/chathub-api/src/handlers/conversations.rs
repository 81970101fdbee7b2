//! Conversation handlers.

use axum::Json;
use axum::extract::{Path, State};

use chathub_core::types::UserId;

use crate::dto::response::{ApiResponse, ConversationOpenedResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/conversations/{peer_id}/open
pub async fn open_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(peer_id): Path<UserId>,
) -> Result<Json<ApiResponse<ConversationOpenedResponse>>, ApiError> {
    let messages = state
        .engine
        .router
        .mark_conversation_delivered(auth.user_id, peer_id)
        .await?;
    Ok(Json(ApiResponse::ok(ConversationOpenedResponse {
        delivered: messages.len(),
        messages,
    })))
}
