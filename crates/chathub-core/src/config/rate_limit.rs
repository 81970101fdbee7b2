//! Rate limit configuration.

use serde::{Deserialize, Serialize};

/// Per-user limits for notifications and live events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Notifications addressed to a user (e.g. new message while offline).
    #[serde(default = "default_creation")]
    pub notification_creation: WindowLimits,
    /// Notification read/delete/mark-all-read operations.
    #[serde(default = "default_action")]
    pub notification_action: WindowLimits,
    /// Inbound live-connection events.
    #[serde(default)]
    pub events: EventRateLimits,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            notification_creation: default_creation(),
            notification_action: default_action(),
            events: EventRateLimits::default(),
        }
    }
}

/// Counts allowed per minute, per hour and optionally per day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowLimits {
    /// Maximum count per one-minute window.
    pub per_minute: u32,
    /// Maximum count per one-hour window.
    pub per_hour: u32,
    /// Maximum count per one-day window. No day window when absent.
    #[serde(default)]
    pub per_day: Option<u32>,
}

/// Per-minute ceilings for inbound socket events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventRateLimits {
    /// `message_send` events.
    #[serde(default = "default_message_events")]
    pub message_per_minute: u32,
    /// `typing` events.
    #[serde(default = "default_typing_events")]
    pub typing_per_minute: u32,
    /// `user_status_update` events.
    #[serde(default = "default_status_events")]
    pub status_update_per_minute: u32,
    /// `webrtc_offer`, `webrtc_answer` and `webrtc_ice_candidate`, combined.
    #[serde(default = "default_webrtc_signal_events")]
    pub webrtc_signal_per_minute: u32,
    /// `call_reconnect` events.
    #[serde(default = "default_call_reconnect_events")]
    pub call_reconnect_per_minute: u32,
}

impl Default for EventRateLimits {
    fn default() -> Self {
        Self {
            message_per_minute: default_message_events(),
            typing_per_minute: default_typing_events(),
            status_update_per_minute: default_status_events(),
            webrtc_signal_per_minute: default_webrtc_signal_events(),
            call_reconnect_per_minute: default_call_reconnect_events(),
        }
    }
}

fn default_creation() -> WindowLimits {
    WindowLimits {
        per_minute: 60,
        per_hour: 500,
        per_day: Some(2000),
    }
}

fn default_action() -> WindowLimits {
    WindowLimits {
        per_minute: 100,
        per_hour: 1000,
        per_day: None,
    }
}

fn default_message_events() -> u32 {
    100
}

fn default_typing_events() -> u32 {
    60
}

fn default_status_events() -> u32 {
    10
}

fn default_webrtc_signal_events() -> u32 {
    50
}

fn default_call_reconnect_events() -> u32 {
    10
}
