//! Addressing of a message: exactly one of a user or a group.

use serde::{Deserialize, Serialize};

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{GroupId, UserId};

/// Who a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageTarget {
    /// One-to-one conversation.
    Direct(UserId),
    /// Group conversation.
    Group(GroupId),
}

impl MessageTarget {
    /// Build a target from the two optional wire fields.
    ///
    /// Fails when both or neither are set.
    pub fn from_parts(recipient_id: Option<UserId>, group_id: Option<GroupId>) -> AppResult<Self> {
        match (recipient_id, group_id) {
            (Some(user), None) => Ok(Self::Direct(user)),
            (None, Some(group)) => Ok(Self::Group(group)),
            (Some(_), Some(_)) => Err(AppError::validation(
                "Message cannot have both recipient_id and group_id",
            )),
            (None, None) => Err(AppError::validation(
                "Message must have either recipient_id or group_id",
            )),
        }
    }

    /// Direct recipient, if any.
    pub fn recipient_id(&self) -> Option<UserId> {
        match self {
            Self::Direct(user) => Some(*user),
            Self::Group(_) => None,
        }
    }

    /// Group, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Direct(_) => None,
            Self::Group(group) => Some(*group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::error::ErrorKind;

    #[test]
    fn test_exactly_one_target() {
        let user = UserId::new();
        let group = GroupId::new();

        assert_eq!(
            MessageTarget::from_parts(Some(user), None).expect("direct"),
            MessageTarget::Direct(user)
        );
        assert_eq!(
            MessageTarget::from_parts(None, Some(group)).expect("group"),
            MessageTarget::Group(group)
        );

        let both = MessageTarget::from_parts(Some(user), Some(group)).unwrap_err();
        assert_eq!(both.kind, ErrorKind::Validation);
        let neither = MessageTarget::from_parts(None, None).unwrap_err();
        assert_eq!(neither.kind, ErrorKind::Validation);
    }
}
