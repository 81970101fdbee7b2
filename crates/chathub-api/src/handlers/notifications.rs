//! Notification action handler.
//!
//! Notification rows live in an external store; this endpoint enforces the
//! per-user action limit before the action is handed on.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::request::NotificationActionRequest;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/notifications/actions
pub async fn perform_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<NotificationActionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state
        .engine
        .notification_limiter
        .can_perform_action(auth.user_id)
        .into_result("Too many notification actions")?;

    tracing::debug!(
        user_id = %auth.user_id,
        action = ?req.action,
        notification_id = ?req.notification_id,
        "Notification action accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "success": true,
            "data": { "action": req.action, "notification_id": req.notification_id }
        })),
    ))
}
