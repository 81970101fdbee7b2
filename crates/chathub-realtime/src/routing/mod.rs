//! Message routing and typing relay.

pub mod router;
pub mod typing;

pub use router::MessageRouter;
pub use typing::TypingRelay;
