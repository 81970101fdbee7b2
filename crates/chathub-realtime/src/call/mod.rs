//! Call signalling.

pub mod manager;
pub mod signaling;
pub mod sweeper;

pub use manager::CallSessionManager;
pub use signaling::SignalKind;
