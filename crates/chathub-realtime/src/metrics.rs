//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Connections currently registered
    pub connections_active: AtomicU64,
    /// Events written to a connection's outbound queue
    pub events_sent: AtomicU64,
    /// Events that could not be written (closed or full queue)
    pub deliveries_failed: AtomicU64,
    /// Messages persisted and routed
    pub messages_routed: AtomicU64,
    /// Push notifications handed to the gateway
    pub push_dispatched: AtomicU64,
    /// Push notifications denied by the rate limiter
    pub push_suppressed: AtomicU64,
    /// Push notifications the gateway failed to accept
    pub push_failed: AtomicU64,
    /// Inbound events denied by the event rate limiter
    pub events_rate_limited: AtomicU64,
    /// Ringing calls expired to `missed`
    pub calls_missed: AtomicU64,
    /// Connected calls force-ended at the duration cap
    pub calls_timed_out: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Increment a counter by one
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` to a counter
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            push_dispatched: self.push_dispatched.load(Ordering::Relaxed),
            push_suppressed: self.push_suppressed.load(Ordering::Relaxed),
            push_failed: self.push_failed.load(Ordering::Relaxed),
            events_rate_limited: self.events_rate_limited.load(Ordering::Relaxed),
            calls_missed: self.calls_missed.load(Ordering::Relaxed),
            calls_timed_out: self.calls_timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Events queued to connections
    pub events_sent: u64,
    /// Events that failed to queue
    pub deliveries_failed: u64,
    /// Messages routed
    pub messages_routed: u64,
    /// Push notifications dispatched
    pub push_dispatched: u64,
    /// Push notifications suppressed by rate limiting
    pub push_suppressed: u64,
    /// Push notifications rejected by the gateway
    pub push_failed: u64,
    /// Inbound events rejected by rate limiting
    pub events_rate_limited: u64,
    /// Calls expired as missed
    pub calls_missed: u64,
    /// Calls ended at the duration cap
    pub calls_timed_out: u64,
}
