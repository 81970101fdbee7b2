//! Notification creation and action limits.

use chathub_core::config::RateLimitConfig;
use chathub_core::config::WindowLimits;
use chathub_core::traits::CounterMaintenance;
use chathub_core::types::UserId;

use super::window::{RateDecision, WindowPolicy, WindowedCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Counter {
    Creation,
    Action,
}

/// Bounds how many notifications a user can receive and how many
/// notification actions (read, delete, mark-all-read) they can perform.
#[derive(Debug)]
pub struct NotificationRateLimiter {
    counters: WindowedCounters<(UserId, Counter)>,
    creation: Vec<WindowPolicy>,
    action: Vec<WindowPolicy>,
}

fn policies(limits: WindowLimits) -> Vec<WindowPolicy> {
    let mut policies = vec![
        WindowPolicy::per_minute(limits.per_minute),
        WindowPolicy::per_hour(limits.per_hour),
    ];
    if let Some(per_day) = limits.per_day {
        policies.push(WindowPolicy::per_day(per_day));
    }
    policies
}

impl NotificationRateLimiter {
    /// Create a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            counters: WindowedCounters::new(),
            creation: policies(config.notification_creation),
            action: policies(config.notification_action),
        }
    }

    /// Check, and on success count, one notification addressed to `user_id`.
    pub fn can_create_notification(&self, user_id: UserId) -> RateDecision {
        self.counters
            .check_and_record((user_id, Counter::Creation), &self.creation)
    }

    /// Check, and on success count, one notification action by `user_id`.
    pub fn can_perform_action(&self, user_id: UserId) -> RateDecision {
        self.counters
            .check_and_record((user_id, Counter::Action), &self.action)
    }

    /// Forget all counters.
    pub fn reset(&self) {
        self.counters.clear();
    }
}

impl CounterMaintenance for NotificationRateLimiter {
    fn purge_expired(&self) -> usize {
        self.counters.purge_expired()
    }
}
