//! Call session manager: the `calling → connected → ended` state machine.
//!
//! Every transition is a compare-and-set in the call store, so a user
//! action racing the expiry sweep settles exactly once. The loser sees
//! `Conflict` (user action) or a skipped candidate (sweep).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use chathub_core::config::CallConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_database::{CallStore, DirectoryStore, MessageStore};
use chathub_entity::call::{CallEndReason, CallSession, CallStatus, CallTransition};
use chathub_entity::message::{MessageKind, MessageTarget, NewMessage};

use crate::connection::ConnectionRegistry;
use crate::message::types::{CallResponse, ServerEvent};
use crate::metrics::RealtimeMetrics;
use crate::notification::{NotificationDispatcher, PushPayload};

/// Drives call sessions and notifies both participants of each change.
pub struct CallSessionManager {
    pub(crate) calls: Arc<dyn CallStore>,
    directory: Arc<dyn DirectoryStore>,
    messages: Arc<dyn MessageStore>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    notifications: Arc<NotificationDispatcher>,
    pub(crate) config: CallConfig,
    pub(crate) metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for CallSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSessionManager")
            .field("config", &self.config)
            .finish()
    }
}

impl CallSessionManager {
    /// Create a manager.
    pub fn new(
        config: CallConfig,
        calls: Arc<dyn CallStore>,
        directory: Arc<dyn DirectoryStore>,
        messages: Arc<dyn MessageStore>,
        registry: Arc<ConnectionRegistry>,
        notifications: Arc<NotificationDispatcher>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            calls,
            directory,
            messages,
            registry,
            notifications,
            config,
            metrics,
        }
    }

    /// Start ringing `recipient_id`.
    ///
    /// Fails with `Validation` for a self-call, `NotFound` for an unknown
    /// recipient and `Conflict` when either side already has an active call.
    pub async fn initiate(&self, caller_id: UserId, recipient_id: UserId) -> AppResult<CallSession> {
        if caller_id == recipient_id {
            return Err(AppError::validation("Cannot call yourself"));
        }
        if !self.directory.user_exists(recipient_id).await? {
            return Err(AppError::not_found(format!(
                "Recipient {recipient_id} not found"
            )));
        }
        let session = self
            .calls
            .create_if_idle(&CallSession::ringing(caller_id, recipient_id, Utc::now()))
            .await?;

        let delivered = self.registry.send_to_user(
            recipient_id,
            &ServerEvent::CallIncoming {
                call_id: session.id,
                caller_id,
                created_at: session.created_at,
            },
        );
        if delivered == 0 {
            if let Err(e) = self
                .notifications
                .notify_offline(recipient_id, PushPayload::incoming_call(&session))
            {
                debug!(call_id = %session.id, error = %e, "Incoming call push suppressed");
            }
        }

        info!(
            call_id = %session.id,
            caller_id = %caller_id,
            recipient_id = %recipient_id,
            "Call initiated"
        );
        Ok(session)
    }

    /// Answer a ringing call. Only the recipient may accept.
    pub async fn accept(&self, call_id: CallId, user_id: UserId) -> AppResult<CallSession> {
        let session = self.load(call_id).await?;
        if session.recipient_id != user_id {
            return Err(AppError::authorization("Only the recipient can accept a call"));
        }
        let session = self
            .apply(&session, CallTransition::accept(Utc::now()))
            .await?;

        self.notify_both(
            &session,
            &ServerEvent::CallResponse {
                call_id,
                response: CallResponse::Accepted,
            },
        );
        info!(call_id = %call_id, "Call accepted");
        Ok(session)
    }

    /// Decline a ringing call. Only the recipient may reject.
    pub async fn reject(&self, call_id: CallId, user_id: UserId) -> AppResult<CallSession> {
        let session = self.load(call_id).await?;
        if session.recipient_id != user_id {
            return Err(AppError::authorization("Only the recipient can reject a call"));
        }
        let session = self
            .apply(&session, CallTransition::reject(Utc::now()))
            .await?;

        self.notify_both(
            &session,
            &ServerEvent::CallResponse {
                call_id,
                response: CallResponse::Rejected,
            },
        );
        self.record_history(&session).await;
        info!(call_id = %call_id, "Call rejected");
        Ok(session)
    }

    /// Hang up. Either participant may end a call.
    ///
    /// A connected call becomes `ended` with its duration; a call still
    /// ringing becomes `missed`. Ending a settled call is a `Conflict`.
    pub async fn end(&self, call_id: CallId, user_id: UserId) -> AppResult<CallSession> {
        let session = self.load(call_id).await?;
        if !session.involves(user_id) {
            return Err(AppError::authorization("Not a participant of this call"));
        }

        let now = Utc::now();
        let transition = match session.status {
            CallStatus::Connected => CallTransition::end(now, CallEndReason::Hangup),
            CallStatus::Calling => CallTransition::miss(now, CallEndReason::Hangup),
            status => {
                return Err(AppError::conflict(format!("Call already {status}")));
            }
        };
        let session = self.apply(&session, transition).await?;
        self.announce_terminal(&session);
        self.record_history(&session).await;
        info!(call_id = %call_id, status = %session.status, "Call ended");
        Ok(session)
    }

    /// Look up a session visible to `user_id`.
    pub async fn get(&self, call_id: CallId, user_id: UserId) -> AppResult<CallSession> {
        let session = self.load(call_id).await?;
        if !session.involves(user_id) {
            return Err(AppError::authorization("Not a participant of this call"));
        }
        Ok(session)
    }

    async fn load(&self, call_id: CallId) -> AppResult<CallSession> {
        self.calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Call {call_id} not found")))
    }

    async fn apply(
        &self,
        session: &CallSession,
        transition: CallTransition,
    ) -> AppResult<CallSession> {
        if session.status != transition.from {
            return Err(AppError::conflict(format!(
                "Call is {}, cannot become {}",
                session.status, transition.to
            )));
        }
        self.calls
            .transition(session.id, &transition)
            .await?
            .ok_or_else(|| AppError::conflict("Call state changed concurrently"))
    }

    pub(crate) fn notify_both(&self, session: &CallSession, event: &ServerEvent) {
        self.registry.send_to_users(&session.participants(), event);
    }

    /// Emit `call.missed` or `call.ended` for a settled session.
    pub(crate) fn announce_terminal(&self, session: &CallSession) {
        let reason = session.end_reason.unwrap_or(CallEndReason::Hangup);
        let event = match session.status {
            CallStatus::Ended => ServerEvent::CallEnded {
                call_id: session.id,
                reason,
                duration_seconds: session.duration_seconds,
            },
            _ => ServerEvent::CallMissed {
                call_id: session.id,
                reason,
            },
        };
        self.notify_both(session, &event);
    }

    /// Append a call entry to the participants' conversation. Best effort.
    pub(crate) async fn record_history(&self, session: &CallSession) {
        let content = match session.status {
            CallStatus::Missed => "Missed call".to_string(),
            CallStatus::Rejected => "Call declined".to_string(),
            CallStatus::Ended => format_duration(session.duration_seconds.unwrap_or(0)),
            _ => return,
        };

        let created = self
            .messages
            .create(NewMessage {
                sender_id: session.caller_id,
                target: MessageTarget::Direct(session.recipient_id),
                content,
                kind: MessageKind::Call,
                reply_to_id: None,
            })
            .await;
        match created {
            Ok(message) => {
                let event = ServerEvent::Message { message };
                self.notify_both(session, &event);
            }
            Err(e) => {
                warn!(call_id = %session.id, error = %e, "Failed to record call history");
            }
        }
    }

    /// Ringing sessions count as missed once created before this instant.
    pub(crate) fn ring_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::seconds(self.config.ring_timeout_seconds)
    }

    /// Connected sessions are force-ended once started before this instant.
    pub(crate) fn duration_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::seconds(self.config.max_duration_seconds)
    }
}

fn format_duration(seconds: i64) -> String {
    format!("Call ended ({}:{:02})", seconds / 60, seconds % 60)
}
