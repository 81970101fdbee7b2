//! Push notifications for offline recipients.

pub mod dispatcher;
pub mod push;

pub use dispatcher::NotificationDispatcher;
pub use push::{HttpPushGateway, LogPushGateway, PushGateway, PushPayload};
