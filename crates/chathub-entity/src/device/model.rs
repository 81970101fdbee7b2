//! Device entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{DeviceId, UserId};

/// A device registered for push notifications.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    /// Unique device identifier.
    pub id: DeviceId,
    /// Owner.
    pub user_id: UserId,
    /// Provider push token.
    pub push_token: String,
    /// `ios`, `android` or `web`.
    pub platform: String,
    /// Whether pushes should be sent to this device.
    pub is_active: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}
