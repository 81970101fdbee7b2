//! Call session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{CallId, UserId};

use super::status::{CallEndReason, CallStatus};

/// A persisted call session between two users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CallSession {
    /// Unique session identifier.
    pub id: CallId,
    /// Who placed the call.
    pub caller_id: UserId,
    /// Who was called.
    pub recipient_id: UserId,
    /// Current state.
    pub status: CallStatus,
    /// When the call was placed.
    pub created_at: DateTime<Utc>,
    /// When the call was answered.
    pub started_at: Option<DateTime<Utc>>,
    /// When the call reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole seconds between `started_at` and `ended_at`.
    pub duration_seconds: Option<i64>,
    /// Why the call ended.
    pub end_reason: Option<CallEndReason>,
}

impl CallSession {
    /// Create a ringing session.
    pub fn ringing(caller_id: UserId, recipient_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CallId::new(),
            caller_id,
            recipient_id,
            status: CallStatus::Calling,
            created_at: now,
            started_at: None,
            ended_at: None,
            duration_seconds: None,
            end_reason: None,
        }
    }

    /// Whether `user_id` is the caller or the recipient.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.caller_id == user_id || self.recipient_id == user_id
    }

    /// Both participants, caller first.
    pub fn participants(&self) -> [UserId; 2] {
        [self.caller_id, self.recipient_id]
    }

    /// The participant on the other end from `user_id`.
    pub fn peer_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.caller_id {
            Some(self.recipient_id)
        } else if user_id == self.recipient_id {
            Some(self.caller_id)
        } else {
            None
        }
    }

    /// Apply a transition in place. The caller has already checked `from`.
    pub fn apply(&mut self, transition: &CallTransition) {
        self.status = transition.to;
        if transition.to == CallStatus::Connected {
            self.started_at = Some(transition.at);
        }
        if transition.to.is_terminal() {
            self.ended_at = Some(transition.at);
            self.end_reason = transition.end_reason;
            self.duration_seconds = self
                .started_at
                .map(|started| (transition.at - started).num_seconds().max(0));
        }
    }
}

/// A guarded state change: applies only while the session is in `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTransition {
    /// Required current state.
    pub from: CallStatus,
    /// Target state.
    pub to: CallStatus,
    /// Effective time of the change.
    pub at: DateTime<Utc>,
    /// Recorded for terminal targets.
    pub end_reason: Option<CallEndReason>,
}

impl CallTransition {
    /// `calling → connected`.
    pub fn accept(at: DateTime<Utc>) -> Self {
        Self {
            from: CallStatus::Calling,
            to: CallStatus::Connected,
            at,
            end_reason: None,
        }
    }

    /// `calling → rejected`.
    pub fn reject(at: DateTime<Utc>) -> Self {
        Self {
            from: CallStatus::Calling,
            to: CallStatus::Rejected,
            at,
            end_reason: Some(CallEndReason::Declined),
        }
    }

    /// `calling → missed`, either a caller hang-up or the ring timeout.
    pub fn miss(at: DateTime<Utc>, reason: CallEndReason) -> Self {
        Self {
            from: CallStatus::Calling,
            to: CallStatus::Missed,
            at,
            end_reason: Some(reason),
        }
    }

    /// `connected → ended`.
    pub fn end(at: DateTime<Utc>, reason: CallEndReason) -> Self {
        Self {
            from: CallStatus::Connected,
            to: CallStatus::Ended,
            at,
            end_reason: Some(reason),
        }
    }
}
