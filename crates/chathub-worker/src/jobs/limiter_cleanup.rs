//! Limiter cleanup job. Drops rate-limit counters whose windows have rolled over.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing;

use chathub_core::traits::CounterMaintenance;

use crate::executor::{JobExecutionError, JobHandler};

/// Purges expired counters from every registered limiter.
pub struct LimiterCleanupJob {
    counters: Vec<Arc<dyn CounterMaintenance>>,
}

impl std::fmt::Debug for LimiterCleanupJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterCleanupJob")
            .field("limiters", &self.counters.len())
            .finish()
    }
}

impl LimiterCleanupJob {
    /// Create the job over a set of limiters.
    pub fn new(counters: Vec<Arc<dyn CounterMaintenance>>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl JobHandler for LimiterCleanupJob {
    fn job_type(&self) -> &str {
        "limiter_cleanup"
    }

    async fn execute(&self) -> Result<Value, JobExecutionError> {
        let purged: usize = self.counters.iter().map(|c| c.purge_expired()).sum();
        if purged > 0 {
            tracing::info!(purged, "Purged expired rate-limit counters");
        }
        Ok(json!({ "purged": purged }))
    }
}
