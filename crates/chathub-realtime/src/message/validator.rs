//! Validation of send payloads, run before any store access.

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_entity::message::MessageTarget;

use super::types::SendMessage;

/// Check a send payload and resolve its single target.
///
/// Rejects both/neither of recipient and group, blank content, and content
/// longer than `max_content_length` characters.
pub fn validate_send(payload: &SendMessage, max_content_length: usize) -> AppResult<MessageTarget> {
    let target = MessageTarget::from_parts(payload.recipient_id, payload.group_id)?;

    if payload.content.trim().is_empty() {
        return Err(AppError::validation("Message content must not be empty"));
    }

    let length = payload.content.chars().count();
    if length > max_content_length {
        return Err(AppError::validation(format!(
            "Message content is {length} characters; the limit is {max_content_length}"
        )));
    }

    Ok(target)
}
