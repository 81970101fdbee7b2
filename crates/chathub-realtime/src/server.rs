//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use chathub_core::config::AppConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::traits::{CallExpiry, CounterMaintenance};
use chathub_core::types::ConnectionId;
use chathub_database::Stores;

use crate::call::CallSessionManager;
use crate::connection::heartbeat::run_heartbeat;
use crate::connection::{AuthenticatedUser, ConnectionRegistry, Registration};
use crate::group::{GroupFanout, GroupMembershipService};
use crate::limiter::{EventRateLimiter, NotificationRateLimiter};
use crate::message::types::ServerEvent;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::notification::{NotificationDispatcher, PushGateway};
use crate::presence::PresenceBroadcaster;
use crate::routing::{MessageRouter, TypingRelay};

/// Central real-time engine that coordinates all WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Online/offline broadcasts.
    pub presence: Arc<PresenceBroadcaster>,
    /// Message send and receipts.
    pub router: Arc<MessageRouter>,
    /// Typing indicators.
    pub typing: Arc<TypingRelay>,
    /// Group join/leave.
    pub groups: Arc<GroupMembershipService>,
    /// Call signalling.
    pub calls: Arc<CallSessionManager>,
    /// Offline push fallback.
    pub notifications: Arc<NotificationDispatcher>,
    /// Notification creation and action limits.
    pub notification_limiter: Arc<NotificationRateLimiter>,
    /// Inbound socket event limits.
    pub event_limiter: Arc<EventRateLimiter>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    heartbeat_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: &AppConfig, stores: Stores, push: Arc<dyn PushGateway>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let realtime = &config.realtime;

        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(realtime, metrics.clone()));
        let fanout = GroupFanout::new(stores.groups.clone());

        let notification_limiter = Arc::new(NotificationRateLimiter::new(&config.rate_limit));
        let event_limiter = Arc::new(EventRateLimiter::new(config.rate_limit.events));
        let notifications = Arc::new(NotificationDispatcher::new(
            notification_limiter.clone(),
            stores.devices.clone(),
            push,
            metrics.clone(),
        ));

        let presence = Arc::new(PresenceBroadcaster::new(
            registry.clone(),
            stores.directory.clone(),
            stores.groups.clone(),
            Duration::from_millis(realtime.presence_grace_period_ms),
        ));
        let router = Arc::new(MessageRouter::new(
            realtime,
            stores.messages.clone(),
            stores.groups.clone(),
            stores.directory.clone(),
            fanout.clone(),
            registry.clone(),
            notifications.clone(),
            metrics.clone(),
        ));
        let typing = Arc::new(TypingRelay::new(realtime, registry.clone(), fanout));
        let groups = Arc::new(GroupMembershipService::new(
            stores.groups.clone(),
            registry.clone(),
        ));
        let calls = Arc::new(CallSessionManager::new(
            config.calls.clone(),
            stores.calls.clone(),
            stores.directory.clone(),
            stores.messages.clone(),
            registry.clone(),
            notifications.clone(),
            metrics.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            registry,
            presence,
            router,
            typing,
            groups,
            calls,
            notifications,
            notification_limiter,
            event_limiter,
            metrics,
            heartbeat_interval: Duration::from_secs(realtime.heartbeat_interval_seconds.max(1)),
            shutdown_tx,
        }
    }

    /// Register an authenticated socket.
    ///
    /// Sends `authenticated`, announces presence and starts the heartbeat.
    /// The returned receiver carries every event for the socket writer.
    pub async fn connect(&self, user: &AuthenticatedUser) -> AppResult<Registration> {
        let registration =
            self.registry
                .register(user.user_id, ConnectionId::new(), &user.username)?;

        if let Err(e) = registration.handle.send(ServerEvent::Authenticated {
            user_id: user.user_id,
            username: user.username.clone(),
            timestamp: Utc::now(),
        }) {
            debug!(conn_id = %registration.handle.id, error = %e, "Failed to queue handshake");
        }

        self.presence
            .user_connected(user.user_id, registration.first_connection)
            .await;

        let engine = self.clone();
        let handle = registration.handle.clone();
        let interval = self.heartbeat_interval;
        tokio::spawn(async move {
            run_heartbeat(handle.clone(), interval).await;
            engine.disconnect(handle.id).await;
        });

        Ok(registration)
    }

    /// Remove a socket. Idempotent.
    ///
    /// When it was the user's last connection, running typing indicators
    /// stop at once and the offline broadcast is scheduled.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let Some(removed) = self.registry.unregister(&connection_id) else {
            return;
        };
        if removed.last_connection {
            let user_id = removed.handle.user_id;
            self.typing.clear_user(user_id).await;
            self.presence.user_disconnected(user_id);
        }
    }

    /// The call sweep as a worker job target.
    pub fn call_expiry(&self) -> Arc<dyn CallExpiry> {
        self.calls.clone()
    }

    /// Counters the cleanup job should purge.
    pub fn counter_maintenance(&self) -> Vec<Arc<dyn CounterMaintenance>> {
        vec![
            self.notification_limiter.clone() as Arc<dyn CounterMaintenance>,
            self.event_limiter.clone() as Arc<dyn CounterMaintenance>,
        ]
    }

    /// Current counter values.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        let _ = self.shutdown_tx.send(());
        self.typing.shutdown();
        self.presence.shutdown();
        self.registry.close_all();
        self.notification_limiter.reset();
        self.event_limiter.reset();

        info!("Real-time engine shut down");
        Ok(())
    }
}
