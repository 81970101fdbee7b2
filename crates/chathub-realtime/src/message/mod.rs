//! Wire protocol: event types, payload validation, and inbound dispatch.

pub mod dispatch;
pub mod types;
pub mod validator;

pub use types::{CallResponse, ClientEvent, SendMessage, ServerEvent};
