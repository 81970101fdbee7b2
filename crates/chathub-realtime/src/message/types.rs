//! Inbound and outbound WebSocket event definitions.
//!
//! Both directions are closed enums tagged by `type`. Anything that does
//! not deserialize into [`ClientEvent`] is rejected with an `error` event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::types::{CallId, GroupId, MessageId, UserId};
use chathub_entity::call::CallEndReason;
use chathub_entity::message::Message;

use crate::presence::PresenceStatus;

/// Payload of a send request, shared by the socket and the REST endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessage {
    /// Direct recipient. Mutually exclusive with `group_id`.
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    /// Target group. Mutually exclusive with `recipient_id`.
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Message body.
    #[serde(default)]
    pub content: String,
    /// Message being replied to.
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
}

/// Events sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Send a message.
    MessageSend {
        /// Direct recipient.
        #[serde(default)]
        recipient_id: Option<UserId>,
        /// Target group.
        #[serde(default)]
        group_id: Option<GroupId>,
        /// Body.
        #[serde(default)]
        content: String,
        /// Replied-to message.
        #[serde(default)]
        reply_to_id: Option<MessageId>,
        /// Opaque id echoed back in `message_sent`.
        #[serde(default)]
        client_id: Option<String>,
    },
    /// Start or stop a typing indicator.
    Typing {
        /// Direct conversation partner.
        #[serde(default)]
        recipient_id: Option<UserId>,
        /// Group conversation.
        #[serde(default)]
        group_id: Option<GroupId>,
        /// `false` stops the indicator.
        is_typing: bool,
    },
    /// Change the user's own presence status.
    UserStatusUpdate {
        /// New status.
        status: PresenceStatus,
    },
    /// Acknowledge delivery of a message.
    MessageDelivered {
        /// Message id.
        message_id: MessageId,
    },
    /// Mark a message as read.
    MessageRead {
        /// Message id.
        message_id: MessageId,
    },
    /// Acknowledge delivery of a group message to this member.
    GroupMessageDelivered { message_id: MessageId },
    /// Mark a group message read by this member.
    GroupMessageRead { message_id: MessageId },
    /// SDP offer for the peer of an active call.
    WebrtcOffer {
        target_user_id: UserId,
        signal: Value,
    },
    /// SDP answer for the peer of an active call.
    WebrtcAnswer {
        target_user_id: UserId,
        signal: Value,
    },
    /// ICE candidate for the peer of an active call.
    WebrtcIceCandidate {
        target_user_id: UserId,
        signal: Value,
    },
    /// Rejoin an active call after a dropped connection.
    CallReconnect { call_id: CallId },
    /// Client keepalive.
    Heartbeat,
}

/// Answer to a ringing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallResponse {
    /// The recipient picked up.
    Accepted,
    /// The recipient declined.
    Rejected,
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake completed.
    Authenticated {
        user_id: UserId,
        username: String,
        timestamp: DateTime<Utc>,
    },
    /// A direct message.
    Message { message: Message },
    /// A message to one of the user's groups.
    GroupMessage { message: Message },
    /// Acknowledges a socket send to the originating connection.
    MessageSent {
        message: Message,
        client_id: Option<String>,
    },
    /// A peer started typing.
    Typing {
        user_id: UserId,
        group_id: Option<GroupId>,
    },
    /// A peer stopped typing.
    StopTyping {
        user_id: UserId,
        group_id: Option<GroupId>,
    },
    /// A peer changed status.
    UserStatusUpdate {
        user_id: UserId,
        status: PresenceStatus,
        timestamp: DateTime<Utc>,
    },
    /// A peer came online.
    UserOnline {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// A peer went offline.
    UserOffline {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Someone joined a group the user belongs to.
    UserJoinedGroup { group_id: GroupId, user_id: UserId },
    /// Someone left a group the user belongs to.
    UserLeftGroup { group_id: GroupId, user_id: UserId },
    /// A message the user sent was delivered.
    MessageDelivered {
        message_id: MessageId,
        user_id: UserId,
        delivered_at: DateTime<Utc>,
    },
    /// A message the user sent was read.
    MessageRead {
        message_id: MessageId,
        user_id: UserId,
        read_at: DateTime<Utc>,
    },
    /// Someone is calling the user.
    #[serde(rename = "call.incoming")]
    CallIncoming {
        call_id: CallId,
        caller_id: UserId,
        created_at: DateTime<Utc>,
    },
    /// The recipient answered a ringing call.
    #[serde(rename = "call.response")]
    CallResponse {
        call_id: CallId,
        response: CallResponse,
    },
    /// A call ended without being answered.
    #[serde(rename = "call.missed")]
    CallMissed {
        call_id: CallId,
        reason: CallEndReason,
    },
    /// A connected call ended.
    #[serde(rename = "call.ended")]
    CallEnded {
        call_id: CallId,
        reason: CallEndReason,
        duration_seconds: Option<i64>,
    },
    /// A participant rejoined an active call.
    #[serde(rename = "call.reconnected")]
    CallReconnected {
        call_id: CallId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Relayed SDP offer.
    WebrtcOffer {
        from: UserId,
        signal: Value,
        timestamp: DateTime<Utc>,
    },
    /// Relayed SDP answer.
    WebrtcAnswer {
        from: UserId,
        signal: Value,
        timestamp: DateTime<Utc>,
    },
    /// Relayed ICE candidate.
    WebrtcIceCandidate {
        from: UserId,
        signal: Value,
        timestamp: DateTime<Utc>,
    },
    /// Server keepalive.
    Heartbeat { timestamp: DateTime<Utc> },
    /// Reply to a client heartbeat.
    Pong { timestamp: DateTime<Utc> },
    /// Operation failed.
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

impl ServerEvent {
    /// Build the `error` event for a failed operation.
    pub fn from_error(err: &AppError) -> Self {
        let code = match err.kind {
            ErrorKind::RateLimit => "RATE_LIMIT_EXCEEDED".to_string(),
            kind => kind.to_string(),
        };
        Self::Error {
            code,
            message: err.message.clone(),
            retry_after: err.retry_after_seconds,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::Message { .. } => "message",
            Self::GroupMessage { .. } => "group_message",
            Self::MessageSent { .. } => "message_sent",
            Self::Typing { .. } => "typing",
            Self::StopTyping { .. } => "stop_typing",
            Self::UserStatusUpdate { .. } => "user_status_update",
            Self::UserOnline { .. } => "user_online",
            Self::UserOffline { .. } => "user_offline",
            Self::UserJoinedGroup { .. } => "user_joined_group",
            Self::UserLeftGroup { .. } => "user_left_group",
            Self::MessageDelivered { .. } => "message_delivered",
            Self::MessageRead { .. } => "message_read",
            Self::CallIncoming { .. } => "call.incoming",
            Self::CallResponse { .. } => "call.response",
            Self::CallMissed { .. } => "call.missed",
            Self::CallEnded { .. } => "call.ended",
            Self::CallReconnected { .. } => "call.reconnected",
            Self::WebrtcOffer { .. } => "webrtc_offer",
            Self::WebrtcAnswer { .. } => "webrtc_answer",
            Self::WebrtcIceCandidate { .. } => "webrtc_ice_candidate",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_events_use_dotted_names() {
        let event = ServerEvent::CallMissed {
            call_id: CallId::new(),
            reason: CallEndReason::Timeout,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "call.missed");
        assert_eq!(json["reason"], "timeout");
        assert_eq!(event.name(), "call.missed");
    }

    #[test]
    fn test_client_events_parse() {
        let heartbeat: ClientEvent = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(heartbeat, ClientEvent::Heartbeat));

        let status: ClientEvent =
            serde_json::from_str(r#"{"type":"user_status_update","status":"away"}"#).unwrap();
        assert!(matches!(
            status,
            ClientEvent::UserStatusUpdate {
                status: PresenceStatus::Away
            }
        ));

        let target = UserId::new();
        let offer: ClientEvent = serde_json::from_value(serde_json::json!({
            "type": "webrtc_offer",
            "target_user_id": target,
            "signal": {"sdp": "v=0", "type": "offer"},
        }))
        .unwrap();
        assert!(matches!(
            offer,
            ClientEvent::WebrtcOffer { target_user_id, ref signal }
                if target_user_id == target && signal["sdp"] == "v=0"
        ));

        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"subscribe"}"#).is_err());
        assert!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"user_status_update","status":"busy"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_rate_limit_error_code() {
        let event = ServerEvent::from_error(&AppError::rate_limited("slow down", 12));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(json["retry_after"], 12);
    }
}
