//! Typing indicator relay.
//!
//! `typing` is forwarded at most once per throttle period per user and
//! conversation. Every start restarts an auto-stop timer; when it fires the
//! peers receive `stop_typing` as if the user had sent it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chathub_core::config::RealtimeConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_entity::message::MessageTarget;

use crate::connection::ConnectionRegistry;
use crate::group::GroupFanout;
use crate::message::types::ServerEvent;

type TypingKey = (UserId, MessageTarget);

#[derive(Debug)]
struct TypingState {
    last_emitted: Instant,
    generation: u64,
    auto_stop: CancellationToken,
}

/// Forwards typing indicators to conversation peers.
pub struct TypingRelay {
    registry: Arc<ConnectionRegistry>,
    fanout: GroupFanout,
    throttle: Duration,
    timeout: Duration,
    active: DashMap<TypingKey, TypingState>,
    generation: AtomicU64,
}

impl std::fmt::Debug for TypingRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingRelay")
            .field("throttle", &self.throttle)
            .field("timeout", &self.timeout)
            .field("active", &self.active.len())
            .finish()
    }
}

impl TypingRelay {
    /// Create a relay.
    pub fn new(config: &RealtimeConfig, registry: Arc<ConnectionRegistry>, fanout: GroupFanout) -> Self {
        Self {
            registry,
            fanout,
            throttle: Duration::from_millis(config.typing_throttle_ms),
            timeout: Duration::from_millis(config.typing_timeout_ms),
            active: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Handle a typing start or stop from `user_id`.
    ///
    /// Group targets require active membership.
    pub async fn handle(
        self: &Arc<Self>,
        user_id: UserId,
        target: MessageTarget,
        is_typing: bool,
    ) -> AppResult<()> {
        if let MessageTarget::Group(group_id) = target {
            if !self.fanout.is_active_member(group_id, user_id).await? {
                return Err(AppError::authorization(format!(
                    "Not a member of group {group_id}"
                )));
            }
        }

        let key = (user_id, target);
        if !is_typing {
            if let Some((_, state)) = self.active.remove(&key) {
                state.auto_stop.cancel();
                self.emit(user_id, target, false).await;
            }
            return Ok(());
        }

        let now = Instant::now();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let auto_stop = CancellationToken::new();
        let should_emit = {
            let previous = self.active.insert(
                key,
                TypingState {
                    last_emitted: now,
                    generation,
                    auto_stop: auto_stop.clone(),
                },
            );
            match previous {
                Some(previous) => {
                    previous.auto_stop.cancel();
                    let throttled = now.duration_since(previous.last_emitted) < self.throttle;
                    if throttled {
                        if let Some(mut state) = self.active.get_mut(&key) {
                            if state.generation == generation {
                                state.last_emitted = previous.last_emitted;
                            }
                        }
                    }
                    !throttled
                }
                None => true,
            }
        };

        self.schedule_auto_stop(key, generation, auto_stop);

        if should_emit {
            self.emit(user_id, target, true).await;
        } else {
            debug!(user_id = %user_id, "Typing event throttled");
        }
        Ok(())
    }

    fn schedule_auto_stop(self: &Arc<Self>, key: TypingKey, generation: u64, cancel: CancellationToken) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(this.timeout) => {
                    let expired = this
                        .active
                        .remove_if(&key, |_, state| state.generation == generation)
                        .is_some();
                    if expired {
                        this.emit(key.0, key.1, false).await;
                    }
                }
            }
        });
    }

    /// Stop every indicator the user has running. Used when the user's last
    /// connection closes.
    pub async fn clear_user(&self, user_id: UserId) {
        let keys: Vec<TypingKey> = self
            .active
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| *entry.key())
            .collect();

        for key in keys {
            if let Some((_, state)) = self.active.remove(&key) {
                state.auto_stop.cancel();
                self.emit(user_id, key.1, false).await;
            }
        }
    }

    /// Whether an indicator is currently running.
    pub fn is_typing(&self, user_id: UserId, target: MessageTarget) -> bool {
        self.active.contains_key(&(user_id, target))
    }

    async fn emit(&self, user_id: UserId, target: MessageTarget, is_typing: bool) {
        let group_id = target.group_id();
        let event = if is_typing {
            ServerEvent::Typing { user_id, group_id }
        } else {
            ServerEvent::StopTyping { user_id, group_id }
        };

        let recipients = match target {
            MessageTarget::Direct(recipient_id) => vec![recipient_id],
            MessageTarget::Group(group_id) => match self.fanout.recipients(group_id, user_id).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "Failed to resolve typing recipients");
                    return;
                }
            },
        };
        self.registry.send_to_users(&recipients, &event);
    }

    /// Cancel all auto-stop timers.
    pub fn shutdown(&self) {
        for entry in self.active.iter() {
            entry.value().auto_stop.cancel();
        }
        self.active.clear();
    }
}
