//! HTTP request handlers organized by domain.

pub mod calls;
pub mod conversations;
pub mod groups;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod presence;
pub mod ws;
