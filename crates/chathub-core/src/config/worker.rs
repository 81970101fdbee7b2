//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled jobs run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression for purging stale rate-limit counters.
    #[serde(default = "default_limiter_cleanup_cron")]
    pub limiter_cleanup_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limiter_cleanup_cron: default_limiter_cleanup_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_limiter_cleanup_cron() -> String {
    "0 */10 * * * *".to_string()
}
