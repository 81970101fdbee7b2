//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use chathub_core::config::{CallConfig, WorkerConfig};
use chathub_core::error::AppError;
use chathub_core::traits::{CallExpiry, CounterMaintenance};

use crate::jobs::{CallExpiryJob, LimiterCleanupJob};
use crate::runner::JobRunner;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Runners registered so far
    runners: Vec<Arc<JobRunner>>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("jobs", &self.runners.len())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            runners: Vec::new(),
        })
    }

    /// Register the call sweep and limiter cleanup on their configured schedules
    pub async fn register_default_tasks(
        &mut self,
        calls: &CallConfig,
        worker: &WorkerConfig,
        expiry: Arc<dyn CallExpiry>,
        counters: Vec<Arc<dyn CounterMaintenance>>,
    ) -> Result<(), AppError> {
        self.schedule(
            &calls.sweep_cron,
            Arc::new(JobRunner::new(Arc::new(CallExpiryJob::new(expiry)))),
        )
        .await?;
        self.schedule(
            &worker.limiter_cleanup_cron,
            Arc::new(JobRunner::new(Arc::new(LimiterCleanupJob::new(counters)))),
        )
        .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Trigger `runner` on every match of the cron expression
    pub async fn schedule(&mut self, cron: &str, runner: Arc<JobRunner>) -> Result<(), AppError> {
        let job_type = runner.job_type().to_string();
        let tick = Arc::clone(&runner);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let runner = Arc::clone(&tick);
            Box::pin(async move {
                runner.run_once().await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid schedule '{}' for {}: {}",
                cron, job_type, e
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {} schedule: {}", job_type, e))
        })?;

        tracing::info!("Registered: {} ({})", job_type, cron);
        self.runners.push(runner);
        Ok(())
    }

    /// Runners registered with this scheduler
    pub fn runners(&self) -> &[Arc<JobRunner>] {
        &self.runners
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chathub_core::result::AppResult;
    use chathub_core::traits::ExpirySummary;
    use chrono::{DateTime, Utc};

    struct NoopExpiry;

    #[async_trait::async_trait]
    impl CallExpiry for NoopExpiry {
        async fn expire_overdue(&self, _now: DateTime<Utc>) -> AppResult<ExpirySummary> {
            Ok(ExpirySummary::default())
        }
    }

    #[tokio::test]
    async fn test_registers_default_tasks() {
        let mut scheduler = CronScheduler::new().await.expect("scheduler");
        scheduler
            .register_default_tasks(
                &CallConfig::default(),
                &WorkerConfig::default(),
                Arc::new(NoopExpiry),
                Vec::new(),
            )
            .await
            .expect("register");

        let types: Vec<&str> = scheduler.runners().iter().map(|r| r.job_type()).collect();
        assert_eq!(types, vec!["call_expiry", "limiter_cleanup"]);
    }

    #[tokio::test]
    async fn test_rejects_bad_cron() {
        let mut scheduler = CronScheduler::new().await.expect("scheduler");
        let runner = Arc::new(JobRunner::new(Arc::new(LimiterCleanupJob::new(Vec::new()))));
        let err = scheduler
            .schedule("every tuesday", runner)
            .await
            .expect_err("invalid cron");
        assert_eq!(err.kind, chathub_core::error::ErrorKind::Configuration);
    }
}
