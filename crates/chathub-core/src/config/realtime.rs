//! Live connection configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Delay before an offline transition is broadcast, absorbing reconnects.
    #[serde(default = "default_grace_period")]
    pub presence_grace_period_ms: u64,
    /// Interval between server heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Maximum live connections per user; the oldest is evicted beyond it.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound buffer per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum message content length in characters.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    /// Mirror a sent message to the sender's own connections.
    #[serde(default)]
    pub echo_to_sender_devices: bool,
    /// Minimum spacing between relayed `typing` events per user and room.
    #[serde(default = "default_typing_throttle")]
    pub typing_throttle_ms: u64,
    /// Idle time after which an automatic `stop_typing` is relayed.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            presence_grace_period_ms: default_grace_period(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            max_content_length: default_max_content_length(),
            echo_to_sender_devices: false,
            typing_throttle_ms: default_typing_throttle(),
            typing_timeout_ms: default_typing_timeout(),
        }
    }
}

fn default_grace_period() -> u64 {
    5000
}

fn default_heartbeat_interval() -> u64 {
    25
}

fn default_max_connections_per_user() -> usize {
    10
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_content_length() -> usize {
    10_000
}

fn default_typing_throttle() -> u64 {
    1000
}

fn default_typing_timeout() -> u64 {
    3000
}
