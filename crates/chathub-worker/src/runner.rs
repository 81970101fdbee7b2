//! Job runner: executes one handler with a single-flight guarantee.
//!
//! A tick that arrives while the previous run is still in progress is
//! skipped rather than queued, so slow passes never pile up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::executor::{JobExecutionError, JobHandler};

/// Result of one trigger.
#[derive(Debug)]
pub enum RunOutcome {
    /// The handler ran to completion.
    Completed(Value),
    /// A previous run was still in flight.
    Skipped,
    /// The handler failed.
    Failed(JobExecutionError),
}

/// Drives one job handler.
#[derive(Debug)]
pub struct JobRunner {
    handler: Arc<dyn JobHandler>,
    running: AtomicBool,
}

/// Clears the in-flight flag even if the run is cancelled mid-way.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobRunner {
    /// Create a runner for a handler
    pub fn new(handler: Arc<dyn JobHandler>) -> Self {
        Self {
            handler,
            running: AtomicBool::new(false),
        }
    }

    /// The handler's job type
    pub fn job_type(&self) -> &str {
        self.handler.job_type()
    }

    /// Whether a run is currently in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run the handler once unless a run is already in flight
    pub async fn run_once(&self) -> RunOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Job '{}' still running, tick skipped", self.job_type());
            return RunOutcome::Skipped;
        }
        let _guard = InFlight(&self.running);

        match self.handler.execute().await {
            Ok(result) => {
                tracing::debug!("Job '{}' completed", self.job_type());
                RunOutcome::Completed(result)
            }
            Err(e) => {
                match &e {
                    JobExecutionError::Transient(msg) => {
                        tracing::warn!("Job '{}' failed (transient): {}", self.job_type(), msg)
                    }
                    other => tracing::error!("Job '{}' failed: {}", self.job_type(), other),
                }
                RunOutcome::Failed(e)
            }
        }
    }
}
