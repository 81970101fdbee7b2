//! Fixed-window counters keyed per user and action.
//!
//! Each key owns one counter per configured window. A window starts on its
//! first use and resets to zero once its length has elapsed. The check and
//! the increment for all of a key's windows happen under the key's map
//! entry lock, so concurrent callers for the same key never interleave.

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;

/// Length and cap of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Window length.
    pub length: Duration,
    /// Calls permitted per window.
    pub max: u32,
}

impl WindowPolicy {
    /// `max` calls per minute.
    pub fn per_minute(max: u32) -> Self {
        Self {
            length: Duration::from_secs(60),
            max,
        }
    }

    /// `max` calls per hour.
    pub fn per_hour(max: u32) -> Self {
        Self {
            length: Duration::from_secs(3600),
            max,
        }
    }

    /// `max` calls per day.
    pub fn per_day(max: u32) -> Self {
        Self {
            length: Duration::from_secs(86_400),
            max,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the call was permitted (and counted).
    pub allowed: bool,
    /// Time until the blocking window resets, when denied.
    pub retry_after: Option<Duration>,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: None,
        }
    }

    fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }

    /// Retry-after rounded up to whole seconds.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            let secs = d.as_secs();
            if d.subsec_nanos() > 0 { secs + 1 } else { secs }
        })
    }

    /// Convert a denial into a `RateLimit` error.
    pub fn into_result(self, message: &str) -> AppResult<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::rate_limited(
                message,
                self.retry_after_seconds().unwrap_or(0),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    policy: WindowPolicy,
    started: Instant,
    count: u32,
}

impl WindowState {
    fn ends_at(&self) -> Instant {
        self.started + self.policy.length
    }
}

/// Process-wide counters. Empty on creation.
#[derive(Debug)]
pub struct WindowedCounters<K: Eq + Hash> {
    entries: DashMap<K, Vec<WindowState>>,
}

impl<K: Eq + Hash> Default for WindowedCounters<K> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> WindowedCounters<K> {
    /// Create an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call against every window in `policies` if none is full.
    ///
    /// A denied call leaves all counts untouched.
    pub fn check_and_record(&self, key: K, policies: &[WindowPolicy]) -> RateDecision {
        let now = Instant::now();
        let mut windows = self.entries.entry(key).or_insert_with(|| {
            policies
                .iter()
                .map(|policy| WindowState {
                    policy: *policy,
                    started: now,
                    count: 0,
                })
                .collect()
        });

        for window in windows.iter_mut() {
            if now >= window.ends_at() {
                window.started = now;
                window.count = 0;
            }
        }

        let blocked_until = windows
            .iter()
            .filter(|w| w.count >= w.policy.max)
            .map(WindowState::ends_at)
            .max();
        if let Some(until) = blocked_until {
            return RateDecision::deny(until.saturating_duration_since(now));
        }

        for window in windows.iter_mut() {
            window.count += 1;
        }
        RateDecision::allow()
    }

    /// Drop keys whose windows have all rolled over. Returns the count removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, windows| windows.iter().any(|w| now < w.ends_at()));
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every counter.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_nth_allowed_next_denied_then_reset() {
        let counters = WindowedCounters::new();
        let policy = [WindowPolicy::per_minute(3)];

        for _ in 0..3 {
            assert!(counters.check_and_record("k", &policy).allowed);
        }
        tokio::time::advance(Duration::from_secs(20)).await;

        let denied = counters.check_and_record("k", &policy);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(40)));
        assert_eq!(denied.retry_after_seconds(), Some(40));

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(counters.check_and_record("k", &policy).allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denials_do_not_count() {
        let counters = WindowedCounters::new();
        let policies = [WindowPolicy::per_minute(2), WindowPolicy::per_hour(5)];

        // Two allowed and eight denied in the first minute.
        for i in 0..10 {
            assert_eq!(counters.check_and_record(1u8, &policies).allowed, i < 2);
        }
        tokio::time::advance(Duration::from_secs(60)).await;

        // The hour window holds 2, so 3 more fit.
        assert!(counters.check_and_record(1u8, &policies).allowed);
        assert!(counters.check_and_record(1u8, &policies).allowed);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(counters.check_and_record(1u8, &policies).allowed);

        let denied = counters.check_and_record(1u8, &policies);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(3600 - 120)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let counters = WindowedCounters::new();
        counters.check_and_record("a", &[WindowPolicy::per_minute(1)]);
        counters.check_and_record("b", &[WindowPolicy::per_hour(1)]);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(counters.purge_expired(), 1);
        assert_eq!(counters.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_never_exceed_cap() {
        let counters = Arc::new(WindowedCounters::new());
        let policy = [WindowPolicy::per_minute(50)];

        let mut tasks = Vec::new();
        for _ in 0..200 {
            let counters = counters.clone();
            tasks.push(tokio::spawn(async move {
                counters.check_and_record("shared", &policy).allowed
            }));
        }

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 50);
    }
}
