//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chathub_core::types::UserId;

/// Start a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateCallRequest {
    /// User to ring.
    pub recipient_id: UserId,
}

/// Kind of notification action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    /// Mark one notification read.
    Read,
    /// Delete one notification.
    Delete,
    /// Mark every notification read.
    MarkAllRead,
}

/// An action on the user's notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationActionRequest {
    /// What to do.
    pub action: NotificationAction,
    /// Target notification; absent for `mark_all_read`.
    #[serde(default)]
    pub notification_id: Option<Uuid>,
}

/// WebSocket upgrade query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    #[serde(default)]
    pub token: Option<String>,
}
