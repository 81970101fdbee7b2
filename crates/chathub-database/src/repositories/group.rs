//! Group and membership repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::{GroupId, UserId};
use chathub_entity::group::{Group, GroupMembership};

use crate::store::GroupStore;

/// Repository for groups and memberships.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to find group", e))
    }

    async fn is_active_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2 AND is_active)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to check membership", e)
        })
    }

    async fn active_members(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM group_members WHERE group_id = $1 AND is_active",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to list group members", e)
        })
    }

    async fn groups_of(&self, user_id: UserId) -> AppResult<Vec<GroupId>> {
        sqlx::query_scalar::<_, GroupId>(
            "SELECT group_id FROM group_members WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to list user groups", e)
        })
    }

    async fn join(
        &self,
        group_id: GroupId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<GroupMembership> {
        sqlx::query_as::<_, GroupMembership>(
            "INSERT INTO group_members (group_id, user_id, is_active, joined_at, left_at) \
             VALUES ($1, $2, TRUE, $3, NULL) \
             ON CONFLICT (group_id, user_id) DO UPDATE SET \
                 is_active = TRUE, \
                 joined_at = CASE WHEN group_members.is_active THEN group_members.joined_at ELSE EXCLUDED.joined_at END, \
                 left_at = NULL \
             RETURNING *",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to join group", e))
    }

    async fn leave(&self, group_id: GroupId, user_id: UserId, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE group_members SET is_active = FALSE, left_at = $3 \
             WHERE group_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to leave group", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_message_at(&self, group_id: GroupId, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE groups SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2) WHERE id = $1",
        )
        .bind(group_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to update last_message_at", e)
        })?;
        Ok(())
    }
}
