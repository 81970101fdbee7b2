//! Call session states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// Ringing, awaiting an answer.
    Calling,
    /// Answered and in progress.
    Connected,
    /// Hung up or force-ended after the duration cap.
    Ended,
    /// Never answered.
    Missed,
    /// Declined by the recipient.
    Rejected,
}

impl CallStatus {
    /// Check if the session is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Missed | Self::Rejected)
    }

    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (Self::Calling, Self::Connected)
                | (Self::Calling, Self::Rejected)
                | (Self::Calling, Self::Missed)
                | (Self::Connected, Self::Ended)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calling => "calling",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Missed => "missed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_end_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallEndReason {
    /// A participant hung up.
    Hangup,
    /// The recipient declined.
    Declined,
    /// The ring timeout or duration cap elapsed.
    Timeout,
}

impl CallEndReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hangup => "hangup",
            Self::Declined => "declined",
            Self::Timeout => "timeout",
        }
    }
}
