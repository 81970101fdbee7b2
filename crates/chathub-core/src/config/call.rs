//! Call signalling configuration.

use serde::{Deserialize, Serialize};

/// Timeouts enforced by the call expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// A session still ringing after this many seconds becomes `missed`.
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: i64,
    /// A connected session is force-ended after this many seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration_seconds: i64,
    /// Cron expression for the sweep tick.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ring_timeout_seconds: default_ring_timeout(),
            max_duration_seconds: default_max_duration(),
            sweep_cron: default_sweep_cron(),
        }
    }
}

fn default_ring_timeout() -> i64 {
    60
}

fn default_max_duration() -> i64 {
    3600
}

fn default_sweep_cron() -> String {
    "0 * * * * *".to_string()
}
