//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{GroupId, MessageId, UserId};

use super::status::MessageStatus;
use super::target::MessageTarget;

/// Kind of message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// User-written text.
    Text,
    /// Call history record appended when a call terminates.
    Call,
}

/// A persisted chat message.
///
/// `recipient_id` and `group_id` are mutually exclusive; rows are only
/// ever created from a [`MessageTarget`], which enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Direct recipient.
    pub recipient_id: Option<UserId>,
    /// Group conversation.
    pub group_id: Option<GroupId>,
    /// Body text.
    pub content: String,
    /// Content kind.
    pub kind: MessageKind,
    /// Delivery status.
    pub status: MessageStatus,
    /// Message this one replies to, by id.
    pub reply_to_id: Option<MessageId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the status first reached `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the status reached `read`.
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Materialize a new row in `sent` state.
    pub fn from_new(new: NewMessage, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            sender_id: new.sender_id,
            recipient_id: new.target.recipient_id(),
            group_id: new.target.group_id(),
            content: new.content,
            kind: new.kind,
            status: MessageStatus::Sent,
            reply_to_id: new.reply_to_id,
            created_at: now,
            delivered_at: None,
            read_at: None,
        }
    }

    /// The message's addressing.
    pub fn target(&self) -> AppResult<MessageTarget> {
        MessageTarget::from_parts(self.recipient_id, self.group_id)
            .map_err(|e| AppError::internal(format!("Corrupt message {}: {}", self.id, e.message)))
    }

    /// Whether `user_id` is the direct recipient.
    pub fn is_addressed_to(&self, user_id: UserId) -> bool {
        self.recipient_id == Some(user_id)
    }
}

/// Input for creating a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Addressing.
    pub target: MessageTarget,
    /// Body text.
    pub content: String,
    /// Content kind.
    pub kind: MessageKind,
    /// Message replied to.
    pub reply_to_id: Option<MessageId>,
}
