//! Per-event limits for inbound socket events.

use chathub_core::config::EventRateLimits;
use chathub_core::traits::CounterMaintenance;
use chathub_core::types::UserId;

use super::window::{RateDecision, WindowPolicy, WindowedCounters};

/// Rate-limited inbound event classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `message_send`
    Message,
    /// `typing`
    Typing,
    /// `user_status_update`
    StatusUpdate,
    /// `webrtc_offer`, `webrtc_answer`, `webrtc_ice_candidate`
    WebrtcSignal,
    /// `call_reconnect`
    CallReconnect,
}

/// Per-minute caps on socket events, per user.
#[derive(Debug)]
pub struct EventRateLimiter {
    counters: WindowedCounters<(UserId, EventKind)>,
    limits: EventRateLimits,
}

impl EventRateLimiter {
    /// Create a limiter from configuration.
    pub fn new(limits: EventRateLimits) -> Self {
        Self {
            counters: WindowedCounters::new(),
            limits,
        }
    }

    /// Check, and on success count, one event.
    pub fn allow(&self, user_id: UserId, kind: EventKind) -> RateDecision {
        let max = match kind {
            EventKind::Message => self.limits.message_per_minute,
            EventKind::Typing => self.limits.typing_per_minute,
            EventKind::StatusUpdate => self.limits.status_update_per_minute,
            EventKind::WebrtcSignal => self.limits.webrtc_signal_per_minute,
            EventKind::CallReconnect => self.limits.call_reconnect_per_minute,
        };
        self.counters
            .check_and_record((user_id, kind), &[WindowPolicy::per_minute(max)])
    }

    /// Forget all counters.
    pub fn reset(&self) {
        self.counters.clear();
    }
}

impl CounterMaintenance for EventRateLimiter {
    fn purge_expired(&self) -> usize {
        self.counters.purge_expired()
    }
}
