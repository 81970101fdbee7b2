//! Inbound socket event dispatch.
//!
//! Each text frame is parsed into a [`ClientEvent`] and handled on behalf
//! of the connection's user. Failures are reported back to that connection
//! only, as an `error` event.

use chrono::Utc;
use tracing::{debug, warn};

use serde_json::Value;

use chathub_core::result::AppResult;
use chathub_core::types::{ConnectionId, UserId};
use chathub_entity::message::MessageTarget;

use crate::call::SignalKind;
use crate::connection::ConnectionHandle;
use crate::limiter::EventKind;
use crate::metrics::RealtimeMetrics;
use crate::server::RealtimeEngine;

use super::types::{ClientEvent, SendMessage, ServerEvent};

impl RealtimeEngine {
    /// Handle one raw frame received on `connection_id`.
    pub async fn handle_inbound(&self, connection_id: ConnectionId, raw: &str) {
        let Some(handle) = self.registry.get(&connection_id) else {
            debug!(conn_id = %connection_id, "Frame for unknown connection dropped");
            return;
        };

        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn_id = %connection_id, error = %e, "Invalid client message");
                reply(
                    &handle,
                    ServerEvent::Error {
                        code: "INVALID_MESSAGE".to_string(),
                        message: format!("Invalid message: {e}"),
                        retry_after: None,
                    },
                );
                return;
            }
        };

        if let Err(e) = self.dispatch(&handle, event).await {
            debug!(conn_id = %connection_id, error = %e, "Client event failed");
            reply(&handle, ServerEvent::from_error(&e));
        }
    }

    async fn dispatch(&self, handle: &ConnectionHandle, event: ClientEvent) -> AppResult<()> {
        let user_id = handle.user_id;
        match event {
            ClientEvent::MessageSend {
                recipient_id,
                group_id,
                content,
                reply_to_id,
                client_id,
            } => {
                self.check_event(user_id, EventKind::Message)?;
                let message = self
                    .router
                    .send(
                        user_id,
                        SendMessage {
                            recipient_id,
                            group_id,
                            content,
                            reply_to_id,
                        },
                    )
                    .await?;
                reply(handle, ServerEvent::MessageSent { message, client_id });
                Ok(())
            }
            ClientEvent::Typing {
                recipient_id,
                group_id,
                is_typing,
            } => {
                self.check_event(user_id, EventKind::Typing)?;
                let target = MessageTarget::from_parts(recipient_id, group_id)?;
                self.typing.handle(user_id, target, is_typing).await
            }
            ClientEvent::UserStatusUpdate { status } => {
                self.check_event(user_id, EventKind::StatusUpdate)?;
                self.presence.update_status(user_id, status).await;
                Ok(())
            }
            ClientEvent::MessageDelivered { message_id } => {
                self.router.mark_delivered(message_id, user_id).await?;
                Ok(())
            }
            ClientEvent::MessageRead { message_id } => {
                self.router.mark_read(message_id, user_id).await?;
                Ok(())
            }
            ClientEvent::GroupMessageDelivered { message_id } => {
                self.router.mark_group_delivered(message_id, user_id).await?;
                Ok(())
            }
            ClientEvent::GroupMessageRead { message_id } => {
                self.router.mark_group_read(message_id, user_id).await?;
                Ok(())
            }
            ClientEvent::WebrtcOffer {
                target_user_id,
                signal,
            } => {
                self.relay(handle, target_user_id, SignalKind::Offer, signal)
                    .await
            }
            ClientEvent::WebrtcAnswer {
                target_user_id,
                signal,
            } => {
                self.relay(handle, target_user_id, SignalKind::Answer, signal)
                    .await
            }
            ClientEvent::WebrtcIceCandidate {
                target_user_id,
                signal,
            } => {
                self.relay(handle, target_user_id, SignalKind::IceCandidate, signal)
                    .await
            }
            ClientEvent::CallReconnect { call_id } => {
                self.check_event(user_id, EventKind::CallReconnect)?;
                self.calls.reconnect(call_id, user_id).await?;
                Ok(())
            }
            ClientEvent::Heartbeat => {
                reply(
                    handle,
                    ServerEvent::Pong {
                        timestamp: Utc::now(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn relay(
        &self,
        handle: &ConnectionHandle,
        target: UserId,
        kind: SignalKind,
        signal: Value,
    ) -> AppResult<()> {
        self.check_event(handle.user_id, EventKind::WebrtcSignal)?;
        let delivered = self
            .calls
            .relay_signal(handle.user_id, target, kind, signal)
            .await?;
        if delivered == 0 {
            reply(
                handle,
                ServerEvent::Error {
                    code: "TARGET_OFFLINE".to_string(),
                    message: "Target user is not online".to_string(),
                    retry_after: None,
                },
            );
        }
        Ok(())
    }

    fn check_event(&self, user_id: UserId, kind: EventKind) -> AppResult<()> {
        let result = self
            .event_limiter
            .allow(user_id, kind)
            .into_result("Too many events, slow down");
        if result.is_err() {
            RealtimeMetrics::inc(&self.metrics.events_rate_limited);
        }
        result
    }
}

fn reply(handle: &ConnectionHandle, event: ServerEvent) {
    if let Err(e) = handle.send(event) {
        warn!(conn_id = %handle.id, error = %e, "Failed to reply on connection");
    }
}
