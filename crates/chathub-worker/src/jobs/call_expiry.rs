//! Call expiry job. Settles ringing and connected calls past their timeouts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing;

use chathub_core::traits::CallExpiry;

use crate::executor::{JobExecutionError, JobHandler};

/// Runs the call expiry sweep.
pub struct CallExpiryJob {
    expiry: Arc<dyn CallExpiry>,
}

impl std::fmt::Debug for CallExpiryJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallExpiryJob").finish()
    }
}

impl CallExpiryJob {
    /// Create the job over an expiry target.
    pub fn new(expiry: Arc<dyn CallExpiry>) -> Self {
        Self { expiry }
    }
}

#[async_trait]
impl JobHandler for CallExpiryJob {
    fn job_type(&self) -> &str {
        "call_expiry"
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        let summary = self
            .expiry
            .expire_overdue(Utc::now())
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Call sweep failed: {}", e)))?;

        tracing::debug!(
            missed = summary.missed,
            ended = summary.ended,
            skipped = summary.skipped,
            "Call expiry pass finished"
        );

        serde_json::to_value(summary)
            .map_err(|e| JobExecutionError::Internal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::error::AppError;
    use chathub_core::result::AppResult;
    use chathub_core::traits::ExpirySummary;
    use chrono::{DateTime, Utc};

    struct FixedExpiry(Option<ExpirySummary>);

    #[async_trait]
    impl CallExpiry for FixedExpiry {
        async fn expire_overdue(&self, _now: DateTime<Utc>) -> AppResult<ExpirySummary> {
            self.0.ok_or_else(|| AppError::persistence("database down"))
        }
    }

    #[tokio::test]
    async fn test_reports_summary() {
        let job = CallExpiryJob::new(Arc::new(FixedExpiry(Some(ExpirySummary {
            missed: 2,
            ended: 1,
            skipped: 0,
        }))));
        let value = job.execute().await.expect("run");
        assert_eq!(value["missed"], 2);
        assert_eq!(value["ended"], 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_transient() {
        let job = CallExpiryJob::new(Arc::new(FixedExpiry(None)));
        let err = job.execute().await.expect_err("fails");
        assert!(matches!(err, JobExecutionError::Transient(_)));
    }
}
