//! Per-user fixed-window rate limiting.

pub mod events;
pub mod notification;
pub mod window;

pub use events::{EventKind, EventRateLimiter};
pub use notification::NotificationRateLimiter;
pub use window::{RateDecision, WindowPolicy, WindowedCounters};
