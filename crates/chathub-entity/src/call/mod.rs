//! Call sessions and their state machine.

pub mod model;
pub mod status;

pub use model::{CallSession, CallTransition};
pub use status::{CallEndReason, CallStatus};
