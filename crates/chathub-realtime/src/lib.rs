//! # chathub-realtime
//!
//! Real-time engine for ChatHub. Provides:
//!
//! - Connection registry for multi-device WebSocket sessions with heartbeats
//! - Presence broadcast to contacts and shared-group peers, debounced on disconnect
//! - Message routing with group fan-out and push fallback for offline recipients
//! - Typing indicators with throttling and automatic stop
//! - Call signalling state machine with an expiry sweep
//! - Per-user rate limiting of notifications and live events

pub mod call;
pub mod connection;
pub mod group;
pub mod limiter;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod presence;
pub mod routing;
pub mod server;

pub use call::manager::CallSessionManager;
pub use connection::registry::ConnectionRegistry;
pub use group::fanout::GroupFanout;
pub use limiter::{EventRateLimiter, NotificationRateLimiter, RateDecision};
pub use message::types::{ClientEvent, SendMessage, ServerEvent};
pub use notification::push::{HttpPushGateway, LogPushGateway, PushGateway, PushPayload};
pub use presence::broadcaster::PresenceBroadcaster;
pub use routing::router::MessageRouter;
pub use server::RealtimeEngine;
