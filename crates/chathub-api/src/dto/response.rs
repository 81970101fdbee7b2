//! Response DTOs.

use serde::{Deserialize, Serialize};

use chathub_entity::message::Message;
use chathub_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Outcome of a delivered/read receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResponse {
    /// Whether the status moved forward.
    pub updated: bool,
    /// The message after the update, when it moved.
    pub message: Option<Message>,
}

/// Messages marked delivered when a conversation was opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationOpenedResponse {
    /// Number of messages that changed.
    pub delivered: usize,
    /// The changed messages.
    pub messages: Vec<Message>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status string.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Status string.
    pub status: String,
    /// Storage backend in use.
    pub storage: String,
    /// Database reachability; `None` with in-memory storage.
    pub database: Option<bool>,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Users with at least one connection.
    pub online_users: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
