//! Presence: status values and the online/offline broadcaster.

pub mod broadcaster;
pub mod status;

pub use broadcaster::PresenceBroadcaster;
pub use status::PresenceStatus;
