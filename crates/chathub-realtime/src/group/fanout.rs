//! Group fan-out: resolves a group to its current members at send time.
//!
//! Every call goes to the group store. Nothing is cached, so a member who
//! leaves stops receiving sends that resolve after the leave commits.

use std::sync::Arc;

use chathub_core::result::AppResult;
use chathub_core::types::{GroupId, UserId};
use chathub_database::GroupStore;

/// Live membership queries.
#[derive(Clone)]
pub struct GroupFanout {
    groups: Arc<dyn GroupStore>,
}

impl std::fmt::Debug for GroupFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupFanout").finish()
    }
}

impl GroupFanout {
    /// Create a fan-out over the given store.
    pub fn new(groups: Arc<dyn GroupStore>) -> Self {
        Self { groups }
    }

    /// Whether the user is currently an active member.
    pub async fn is_active_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool> {
        self.groups.is_active_member(group_id, user_id).await
    }

    /// Current active members.
    pub async fn active_members(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        self.groups.active_members(group_id).await
    }

    /// Current active members other than `exclude`.
    pub async fn recipients(&self, group_id: GroupId, exclude: UserId) -> AppResult<Vec<UserId>> {
        let mut members = self.active_members(group_id).await?;
        members.retain(|member| *member != exclude);
        Ok(members)
    }
}
