//! Presence lookup.

use axum::Json;
use axum::extract::{Path, State};

use chathub_core::types::UserId;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/presence/{user_id}
pub async fn get_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state.engine.presence.status_of(user_id);
    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "user_id": user_id, "status": status }
    })))
}
