//! Message repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::{MessageId, UserId};
use chathub_entity::message::{Message, MessageStatus, NewMessage};

use crate::store::MessageStore;

/// Repository for message persistence.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn create(&self, new: NewMessage) -> AppResult<Message> {
        let row = Message::from_new(new, Utc::now());
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, sender_id, recipient_id, group_id, content, kind, status, reply_to_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(row.id)
        .bind(row.sender_id)
        .bind(row.recipient_id)
        .bind(row.group_id)
        .bind(&row.content)
        .bind(row.kind)
        .bind(row.status)
        .bind(row.reply_to_id)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to create message", e))
    }

    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to find message", e))
    }

    async fn advance_status(
        &self,
        id: MessageId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Message>> {
        // Enum ordering follows declaration order: sent < delivered < read.
        sqlx::query_as::<_, Message>(
            "UPDATE messages SET status = $2, \
             delivered_at = COALESCE(delivered_at, $3), \
             read_at = CASE WHEN $4 THEN $3 ELSE read_at END \
             WHERE id = $1 AND status < $2 RETURNING *",
        )
        .bind(id)
        .bind(next)
        .bind(at)
        .bind(next == MessageStatus::Read)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to update message status", e)
        })
    }

    async fn deliver_conversation(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "UPDATE messages SET status = 'delivered', delivered_at = $3 \
             WHERE sender_id = $1 AND recipient_id = $2 AND status = 'sent' RETURNING *",
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Persistence,
                "Failed to mark conversation delivered",
                e,
            )
        })
    }

    async fn record_group_receipt(
        &self,
        message_id: MessageId,
        user_id: UserId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let changed: Option<(MessageStatus,)> = sqlx::query_as(
            "INSERT INTO group_message_receipts (message_id, user_id, status, delivered_at, read_at) \
             VALUES ($1, $2, $3, $4, CASE WHEN $5 THEN $4 END) \
             ON CONFLICT (message_id, user_id) DO UPDATE SET status = EXCLUDED.status, \
                 read_at = COALESCE(group_message_receipts.read_at, EXCLUDED.read_at) \
             WHERE group_message_receipts.status < EXCLUDED.status \
             RETURNING status",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(next)
        .bind(at)
        .bind(next == MessageStatus::Read)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to record group receipt", e)
        })?;
        Ok(changed.is_some())
    }
}
