//! Message delivery status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of a message. Moves forward only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Persisted, not yet seen by the recipient's client.
    Sent,
    /// The recipient opened or listed the conversation.
    Delivered,
    /// The recipient read the message.
    Read,
}

impl MessageStatus {
    /// Whether moving from `self` to `next` is a forward step.
    ///
    /// Skipping `delivered` is allowed; staying put or going back is not.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        next > *self
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
