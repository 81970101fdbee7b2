//! Group recipient resolution and membership changes.

pub mod fanout;
pub mod membership;

pub use fanout::GroupFanout;
pub use membership::GroupMembershipService;
