//! Scheduled maintenance for ChatHub.
//!
//! This crate provides:
//! - A single-flight job runner that can be triggered on demand or on an interval
//! - A cron scheduler that drives runners on their configured schedules
//! - Built-in jobs for the call expiry sweep and rate-limit counter cleanup

pub mod executor;
pub mod jobs;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobHandler};
pub use runner::{JobRunner, RunOutcome};
pub use scheduler::CronScheduler;
