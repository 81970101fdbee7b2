//! Group membership handlers.

use axum::Json;
use axum::extract::{Path, State};

use chathub_core::types::GroupId;
use chathub_entity::group::GroupMembership;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/groups/{id}/join
pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<GroupId>,
) -> Result<Json<ApiResponse<GroupMembership>>, ApiError> {
    let membership = state.engine.groups.join_group(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(membership)))
}

/// POST /api/groups/{id}/leave
pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<GroupId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.groups.leave_group(id, auth.user_id).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "data": { "group_id": id, "left": true } }),
    ))
}
