//! Messages, their delivery status and their addressing.

pub mod model;
pub mod status;
pub mod target;

pub use model::{Message, MessageKind, NewMessage};
pub use status::MessageStatus;
pub use target::MessageTarget;
