//! Offline push fallback, gated by the notification rate limiter.

use std::sync::Arc;

use tracing::{debug, warn};

use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_database::DeviceStore;

use crate::limiter::NotificationRateLimiter;
use crate::metrics::RealtimeMetrics;

use super::push::{PushGateway, PushPayload};

/// Queues push notifications for users who are not connected.
pub struct NotificationDispatcher {
    limiter: Arc<NotificationRateLimiter>,
    devices: Arc<dyn DeviceStore>,
    gateway: Arc<dyn PushGateway>,
    metrics: Arc<RealtimeMetrics>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    pub fn new(
        limiter: Arc<NotificationRateLimiter>,
        devices: Arc<dyn DeviceStore>,
        gateway: Arc<dyn PushGateway>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            limiter,
            devices,
            gateway,
            metrics,
        }
    }

    /// Queue a push to `recipient`.
    ///
    /// Counts against the creation limit of the notified user. A denial
    /// returns `RateLimit` and nothing is queued. Device lookup and the
    /// gateway call run in the background and only log on failure.
    pub fn notify_offline(&self, recipient: UserId, payload: PushPayload) -> AppResult<()> {
        if let Err(e) = self
            .limiter
            .can_create_notification(recipient)
            .into_result("Notification rate limit exceeded")
        {
            RealtimeMetrics::inc(&self.metrics.push_suppressed);
            return Err(e);
        }

        let devices = self.devices.clone();
        let gateway = self.gateway.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            deliver(devices, gateway, metrics, recipient, payload).await;
        });
        Ok(())
    }
}

async fn deliver(
    devices: Arc<dyn DeviceStore>,
    gateway: Arc<dyn PushGateway>,
    metrics: Arc<RealtimeMetrics>,
    recipient: UserId,
    payload: PushPayload,
) {
    let tokens = match devices.active_push_tokens(recipient).await {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(user_id = %recipient, error = %e, "Failed to load push devices");
            RealtimeMetrics::inc(&metrics.push_failed);
            return;
        }
    };
    if tokens.is_empty() {
        debug!(user_id = %recipient, "No active push devices");
        return;
    }

    match gateway.dispatch(&tokens, &payload).await {
        Ok(()) => RealtimeMetrics::inc(&metrics.push_dispatched),
        Err(e) => {
            RealtimeMetrics::inc(&metrics.push_failed);
            warn!(user_id = %recipient, error = %e, "Push dispatch failed");
        }
    }
}
