//! Expiry sweep over stale call sessions.
//!
//! Ringing sessions past the ring timeout become `missed`. Connected
//! sessions past the duration cap become `ended` with `ended_at` pinned to
//! `started_at + cap`, so the recorded duration equals the cap exactly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use chathub_core::result::AppResult;
use chathub_core::traits::{CallExpiry, ExpirySummary};
use chathub_entity::call::{CallEndReason, CallTransition};

use crate::metrics::RealtimeMetrics;

use super::manager::CallSessionManager;

impl CallSessionManager {
    /// Expire every overdue session as of `now`.
    ///
    /// A candidate that a concurrent accept, reject or hang-up settled
    /// first is counted as skipped and left alone, as is one whose write
    /// fails; the next sweep picks it up again.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<ExpirySummary> {
        let mut summary = ExpirySummary::default();

        for session in self.calls.find_ringing_since(self.ring_cutoff(now)).await? {
            let transition = CallTransition::miss(now, CallEndReason::Timeout);
            match self.calls.transition(session.id, &transition).await {
                Ok(Some(missed)) => {
                    self.announce_terminal(&missed);
                    self.record_history(&missed).await;
                    RealtimeMetrics::inc(&self.metrics.calls_missed);
                    summary.missed += 1;
                }
                Ok(None) => {
                    debug!(call_id = %session.id, "Ringing call settled before sweep");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(call_id = %session.id, error = %e, "Failed to expire ringing call");
                    summary.skipped += 1;
                }
            }
        }

        let cap = chrono::Duration::seconds(self.config.max_duration_seconds);
        for session in self
            .calls
            .find_connected_since(self.duration_cutoff(now))
            .await?
        {
            let ended_at = session.started_at.map_or(now, |started| started + cap);
            let transition = CallTransition::end(ended_at, CallEndReason::Timeout);
            match self.calls.transition(session.id, &transition).await {
                Ok(Some(ended)) => {
                    self.announce_terminal(&ended);
                    self.record_history(&ended).await;
                    RealtimeMetrics::inc(&self.metrics.calls_timed_out);
                    summary.ended += 1;
                }
                Ok(None) => {
                    debug!(call_id = %session.id, "Connected call settled before sweep");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(call_id = %session.id, error = %e, "Failed to end overdue call");
                    summary.skipped += 1;
                }
            }
        }

        if summary.missed > 0 || summary.ended > 0 {
            info!(
                missed = summary.missed,
                ended = summary.ended,
                skipped = summary.skipped,
                "Call expiry sweep completed"
            );
        }
        Ok(summary)
    }
}

#[async_trait]
impl CallExpiry for CallSessionManager {
    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<ExpirySummary> {
        self.sweep(now).await
    }
}
