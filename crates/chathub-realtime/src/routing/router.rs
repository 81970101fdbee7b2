//! Message router: validate, persist, fan out, fall back to push.
//!
//! A send either persists and returns the message, or fails with nothing
//! persisted and nothing emitted. Everything after the write is best
//! effort: per-recipient delivery failures are logged and never reach the
//! sender.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use chathub_core::config::RealtimeConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{MessageId, UserId};
use chathub_database::{DirectoryStore, GroupStore, MessageStore};
use chathub_entity::message::{Message, MessageKind, MessageStatus, MessageTarget, NewMessage};

use crate::connection::ConnectionRegistry;
use crate::group::GroupFanout;
use crate::message::types::{SendMessage, ServerEvent};
use crate::message::validator::validate_send;
use crate::metrics::RealtimeMetrics;
use crate::notification::{NotificationDispatcher, PushPayload};

/// Routes messages and status receipts.
pub struct MessageRouter {
    messages: Arc<dyn MessageStore>,
    groups: Arc<dyn GroupStore>,
    directory: Arc<dyn DirectoryStore>,
    fanout: GroupFanout,
    registry: Arc<ConnectionRegistry>,
    notifications: Arc<NotificationDispatcher>,
    metrics: Arc<RealtimeMetrics>,
    max_content_length: usize,
    echo_to_sender_devices: bool,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("max_content_length", &self.max_content_length)
            .field("echo_to_sender_devices", &self.echo_to_sender_devices)
            .finish()
    }
}

impl MessageRouter {
    /// Create a router.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &RealtimeConfig,
        messages: Arc<dyn MessageStore>,
        groups: Arc<dyn GroupStore>,
        directory: Arc<dyn DirectoryStore>,
        fanout: GroupFanout,
        registry: Arc<ConnectionRegistry>,
        notifications: Arc<NotificationDispatcher>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            messages,
            groups,
            directory,
            fanout,
            registry,
            notifications,
            metrics,
            max_content_length: config.max_content_length,
            echo_to_sender_devices: config.echo_to_sender_devices,
        }
    }

    /// Send a message from `sender_id`.
    ///
    /// Fails with `Validation` on a malformed payload, `NotFound` for an
    /// unknown recipient or group, `Authorization` when the sender is not
    /// an active member of the target group, and `Persistence` when the
    /// write fails. On success the message is returned in `sent` state.
    pub async fn send(&self, sender_id: UserId, payload: SendMessage) -> AppResult<Message> {
        let target = validate_send(&payload, self.max_content_length)?;
        self.authorize(sender_id, target).await?;

        let message = self
            .messages
            .create(NewMessage {
                sender_id,
                target,
                content: payload.content,
                kind: MessageKind::Text,
                reply_to_id: payload.reply_to_id,
            })
            .await?;
        RealtimeMetrics::inc(&self.metrics.messages_routed);

        if let MessageTarget::Group(group_id) = target {
            if let Err(e) = self
                .groups
                .touch_last_message_at(group_id, message.created_at)
                .await
            {
                warn!(group_id = %group_id, error = %e, "Failed to update group lastMessageAt");
            }
        }

        self.fan_out(&message, target).await;

        info!(
            message_id = %message.id,
            sender_id = %sender_id,
            "Message sent"
        );
        Ok(message)
    }

    async fn authorize(&self, sender_id: UserId, target: MessageTarget) -> AppResult<()> {
        match target {
            MessageTarget::Direct(recipient_id) => {
                if !self.directory.user_exists(recipient_id).await? {
                    return Err(AppError::not_found(format!(
                        "Recipient {recipient_id} not found"
                    )));
                }
            }
            MessageTarget::Group(group_id) => {
                if self.groups.find_by_id(group_id).await?.is_none() {
                    return Err(AppError::not_found(format!("Group {group_id} not found")));
                }
                if !self.fanout.is_active_member(group_id, sender_id).await? {
                    return Err(AppError::authorization(format!(
                        "Not a member of group {group_id}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deliver a persisted message to its resolved recipients.
    async fn fan_out(&self, message: &Message, target: MessageTarget) {
        let (recipients, event) = match target {
            MessageTarget::Direct(recipient_id) => (
                vec![recipient_id],
                ServerEvent::Message {
                    message: message.clone(),
                },
            ),
            MessageTarget::Group(group_id) => {
                match self.fanout.recipients(group_id, message.sender_id).await {
                    Ok(members) => (
                        members,
                        ServerEvent::GroupMessage {
                            message: message.clone(),
                        },
                    ),
                    Err(e) => {
                        warn!(
                            message_id = %message.id,
                            group_id = %group_id,
                            error = %e,
                            "Failed to resolve group recipients"
                        );
                        return;
                    }
                }
            }
        };

        for recipient in recipients {
            if recipient == message.sender_id {
                continue;
            }
            let delivered = if self.registry.is_online(recipient) {
                self.registry.send_to_user(recipient, &event)
            } else {
                0
            };
            if delivered == 0 {
                self.push_fallback(message, recipient);
            }
        }

        if self.echo_to_sender_devices {
            self.registry.send_to_user(message.sender_id, &event);
        }
    }

    fn push_fallback(&self, message: &Message, recipient: UserId) {
        match self
            .notifications
            .notify_offline(recipient, PushPayload::new_message(message))
        {
            Ok(()) => debug!(message_id = %message.id, user_id = %recipient, "Push queued"),
            Err(e) => debug!(
                message_id = %message.id,
                user_id = %recipient,
                error = %e,
                "Push suppressed"
            ),
        }
    }

    /// Mark a message delivered to `viewer_id`.
    ///
    /// A no-op (`Ok(None)`) when the viewer is not the direct recipient or
    /// the message is already delivered or read. On a transition the
    /// sender's connections receive `message_delivered`.
    pub async fn mark_delivered(
        &self,
        message_id: MessageId,
        viewer_id: UserId,
    ) -> AppResult<Option<Message>> {
        self.advance(message_id, viewer_id, MessageStatus::Delivered)
            .await
    }

    /// Mark a message read by `reader_id`.
    ///
    /// Same rules as [`MessageRouter::mark_delivered`]; re-reading is a no-op.
    /// On a transition the sender's connections receive `message_read`.
    pub async fn mark_read(
        &self,
        message_id: MessageId,
        reader_id: UserId,
    ) -> AppResult<Option<Message>> {
        self.advance(message_id, reader_id, MessageStatus::Read).await
    }

    async fn advance(
        &self,
        message_id: MessageId,
        user_id: UserId,
        next: MessageStatus,
    ) -> AppResult<Option<Message>> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;

        if !message.is_addressed_to(user_id) || !message.status.can_advance_to(next) {
            debug!(
                message_id = %message_id,
                user_id = %user_id,
                status = %message.status,
                requested = %next,
                "Status update ignored"
            );
            return Ok(None);
        }

        let Some(updated) = self
            .messages
            .advance_status(message_id, next, Utc::now())
            .await?
        else {
            return Ok(None);
        };

        let event = match next {
            MessageStatus::Read => ServerEvent::MessageRead {
                message_id,
                user_id,
                read_at: updated.read_at.unwrap_or_else(Utc::now),
            },
            _ => ServerEvent::MessageDelivered {
                message_id,
                user_id,
                delivered_at: updated.delivered_at.unwrap_or_else(Utc::now),
            },
        };
        self.registry.send_to_user(updated.sender_id, &event);
        Ok(Some(updated))
    }

    /// Record that a group message reached `member_id`'s client.
    ///
    /// Group messages carry a receipt per member. On a forward move the
    /// group's other active members, the sender included, receive
    /// `message_delivered`. Returns whether the receipt moved.
    pub async fn mark_group_delivered(
        &self,
        message_id: MessageId,
        member_id: UserId,
    ) -> AppResult<bool> {
        self.advance_group_receipt(message_id, member_id, MessageStatus::Delivered)
            .await
    }

    /// Record that `member_id` read a group message.
    ///
    /// Same rules as [`MessageRouter::mark_group_delivered`], emitting
    /// `message_read`.
    pub async fn mark_group_read(&self, message_id: MessageId, member_id: UserId) -> AppResult<bool> {
        self.advance_group_receipt(message_id, member_id, MessageStatus::Read)
            .await
    }

    async fn advance_group_receipt(
        &self,
        message_id: MessageId,
        member_id: UserId,
        next: MessageStatus,
    ) -> AppResult<bool> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Message {message_id} not found")))?;
        let Some(group_id) = message.group_id else {
            return Err(AppError::validation(format!(
                "Message {message_id} is not a group message"
            )));
        };
        if message.sender_id == member_id {
            return Ok(false);
        }
        if !self.fanout.is_active_member(group_id, member_id).await? {
            return Err(AppError::authorization(format!(
                "Not a member of group {group_id}"
            )));
        }

        let at = Utc::now();
        if !self
            .messages
            .record_group_receipt(message_id, member_id, next, at)
            .await?
        {
            return Ok(false);
        }

        let event = match next {
            MessageStatus::Read => ServerEvent::MessageRead {
                message_id,
                user_id: member_id,
                read_at: at,
            },
            _ => ServerEvent::MessageDelivered {
                message_id,
                user_id: member_id,
                delivered_at: at,
            },
        };
        let members = self.fanout.recipients(group_id, member_id).await?;
        self.registry.send_to_users(&members, &event);
        Ok(true)
    }

    /// Mark every undelivered message from `peer_id` to `viewer_id` delivered.
    ///
    /// Called when the viewer opens the conversation. `peer_id` receives a
    /// `message_delivered` for each message that changed.
    pub async fn mark_conversation_delivered(
        &self,
        viewer_id: UserId,
        peer_id: UserId,
    ) -> AppResult<Vec<Message>> {
        let changed = self
            .messages
            .deliver_conversation(peer_id, viewer_id, Utc::now())
            .await?;

        for message in &changed {
            self.registry.send_to_user(
                peer_id,
                &ServerEvent::MessageDelivered {
                    message_id: message.id,
                    user_id: viewer_id,
                    delivered_at: message.delivered_at.unwrap_or_else(Utc::now),
                },
            );
        }
        Ok(changed)
    }
}
