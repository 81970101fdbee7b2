//! Built-in job implementations.

pub mod call_expiry;
pub mod limiter_cleanup;

pub use call_expiry::CallExpiryJob;
pub use limiter_cleanup::LimiterCleanupJob;
