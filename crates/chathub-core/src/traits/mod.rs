//! Traits defined in `chathub-core` and implemented by other crates.

pub mod maintenance;

pub use maintenance::{CallExpiry, CounterMaintenance, ExpirySummary};
