//! Media negotiation relay between the two participants of a call.
//!
//! Offers, answers and ICE candidates are opaque to the server. They are
//! forwarded only while the sender and the target share a `calling` or
//! `connected` session.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_entity::call::CallSession;

use crate::message::types::ServerEvent;

use super::manager::CallSessionManager;

/// Kind of a relayed WebRTC signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    IceCandidate,
}

impl SignalKind {
    fn event(self, from: UserId, signal: Value) -> ServerEvent {
        let timestamp = Utc::now();
        match self {
            Self::Offer => ServerEvent::WebrtcOffer {
                from,
                signal,
                timestamp,
            },
            Self::Answer => ServerEvent::WebrtcAnswer {
                from,
                signal,
                timestamp,
            },
            Self::IceCandidate => ServerEvent::WebrtcIceCandidate {
                from,
                signal,
                timestamp,
            },
        }
    }
}

impl CallSessionManager {
    /// Forward a signal from `from` to `target`.
    ///
    /// Fails with `Authorization` unless the two share an active session.
    /// Returns the number of the target's connections reached; zero means
    /// the target is offline.
    pub async fn relay_signal(
        &self,
        from: UserId,
        target: UserId,
        kind: SignalKind,
        signal: Value,
    ) -> AppResult<usize> {
        let shared = self
            .calls
            .find_active_for_user(from)
            .await?
            .is_some_and(|session| session.peer_of(from) == Some(target));
        if !shared {
            return Err(AppError::authorization(
                "No active call with the target user",
            ));
        }

        let delivered = self.registry.send_to_user(target, &kind.event(from, signal));
        debug!(from = %from, to = %target, ?kind, delivered, "Signal relayed");
        Ok(delivered)
    }

    /// Announce that `user_id` rejoined an active call.
    ///
    /// The other participant receives `call.reconnected`. Fails with
    /// `NotFound` for an unknown call, `Authorization` for a non-participant
    /// and `Conflict` once the call has settled.
    pub async fn reconnect(&self, call_id: CallId, user_id: UserId) -> AppResult<CallSession> {
        let session = self
            .calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Call {call_id} not found")))?;
        let Some(peer) = session.peer_of(user_id) else {
            return Err(AppError::authorization("Not a participant of this call"));
        };
        if session.status.is_terminal() {
            return Err(AppError::conflict(format!("Call already {}", session.status)));
        }

        self.registry.send_to_user(
            peer,
            &ServerEvent::CallReconnected {
                call_id,
                user_id,
                timestamp: Utc::now(),
            },
        );
        debug!(call_id = %call_id, user_id = %user_id, "Participant reconnected to call");
        Ok(session)
    }
}
