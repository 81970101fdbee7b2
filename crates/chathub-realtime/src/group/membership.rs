//! Join and leave, with membership events to the group's online members.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{GroupId, UserId};
use chathub_database::GroupStore;
use chathub_entity::group::GroupMembership;

use crate::connection::ConnectionRegistry;
use crate::message::types::ServerEvent;

/// Applies membership changes and announces them.
pub struct GroupMembershipService {
    groups: Arc<dyn GroupStore>,
    registry: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for GroupMembershipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupMembershipService").finish()
    }
}

impl GroupMembershipService {
    /// Create the service.
    pub fn new(groups: Arc<dyn GroupStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { groups, registry }
    }

    /// Add (or re-activate) the user in the group.
    ///
    /// Announces `user_joined_group` to every active member, the joiner included.
    pub async fn join_group(&self, group_id: GroupId, user_id: UserId) -> AppResult<GroupMembership> {
        self.require_group(group_id).await?;
        let membership = self.groups.join(group_id, user_id, Utc::now()).await?;

        let members = self.groups.active_members(group_id).await?;
        self.registry
            .send_to_users(&members, &ServerEvent::UserJoinedGroup { group_id, user_id });

        info!(group_id = %group_id, user_id = %user_id, "User joined group");
        Ok(membership)
    }

    /// Deactivate the user's membership.
    ///
    /// Announces `user_left_group` to the remaining members and to the
    /// leaver's own connections. Fails with `NotFound` if the user was not
    /// an active member.
    pub async fn leave_group(&self, group_id: GroupId, user_id: UserId) -> AppResult<()> {
        self.require_group(group_id).await?;
        if !self.groups.leave(group_id, user_id, Utc::now()).await? {
            return Err(AppError::not_found(format!(
                "User {user_id} is not a member of group {group_id}"
            )));
        }

        let mut audience = self.groups.active_members(group_id).await?;
        audience.push(user_id);
        self.registry
            .send_to_users(&audience, &ServerEvent::UserLeftGroup { group_id, user_id });

        info!(group_id = %group_id, user_id = %user_id, "User left group");
        Ok(())
    }

    async fn require_group(&self, group_id: GroupId) -> AppResult<()> {
        match self.groups.find_by_id(group_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!("Group {group_id} not found"))),
        }
    }
}
