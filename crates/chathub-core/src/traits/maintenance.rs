//! Periodic maintenance hooks driven by the background worker.
//!
//! The worker only knows these traits; the realtime engine implements them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Outcome of one expiry pass over call sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySummary {
    /// Ringing sessions moved to `missed`.
    pub missed: usize,
    /// Connected sessions force-ended at the duration cap.
    pub ended: usize,
    /// Candidates a concurrent transition settled first.
    pub skipped: usize,
}

/// Reconciles call sessions stuck past their timeouts.
#[async_trait]
pub trait CallExpiry: Send + Sync + 'static {
    /// Expire every overdue session as of `now`.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<ExpirySummary>;
}

/// Bounds the memory held by in-process counters.
pub trait CounterMaintenance: Send + Sync + 'static {
    /// Drop counters whose windows have all rolled over. Returns the count removed.
    fn purge_expired(&self) -> usize;
}
