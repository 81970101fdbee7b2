//! Push notification gateway configuration.

use serde::{Deserialize, Serialize};

/// Push gateway implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushProvider {
    /// Write dispatches to the log only.
    #[default]
    Log,
    /// POST dispatches as JSON to `endpoint`.
    Http,
}

/// Push gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Gateway implementation.
    #[serde(default)]
    pub provider: PushProvider,
    /// HTTP endpoint for the `http` provider.
    #[serde(default)]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: PushProvider::default(),
            endpoint: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
