//! Groups and their memberships.

pub mod model;

pub use model::{Group, GroupMembership};
