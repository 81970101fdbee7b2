//! Group and membership entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{GroupId, UserId};

/// A group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Unique group identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Creator.
    pub created_by: UserId,
    /// Time of the most recent group message.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A user's membership in a group. Leaving deactivates the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    /// Member.
    pub user_id: UserId,
    /// Group.
    pub group_id: GroupId,
    /// Whether the member currently belongs to the group.
    pub is_active: bool,
    /// Most recent join time.
    pub joined_at: DateTime<Utc>,
    /// Most recent leave time.
    pub left_at: Option<DateTime<Utc>>,
}

impl GroupMembership {
    /// A fresh active membership.
    pub fn joined(group_id: GroupId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            group_id,
            is_active: true,
            joined_at: now,
            left_at: None,
        }
    }
}
