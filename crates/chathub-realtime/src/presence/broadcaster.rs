//! Presence broadcaster: tells online peers when a user comes and goes.
//!
//! Peers are the user's contacts plus the active members of every group
//! the user belongs to, filtered to those currently online. Going offline
//! is debounced: the `user_offline` broadcast waits for the grace period
//! and is cancelled if the user reconnects in the meantime.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_database::{DirectoryStore, GroupStore};

use crate::connection::ConnectionRegistry;
use crate::message::types::ServerEvent;

use super::status::PresenceStatus;

#[derive(Debug)]
struct PendingOffline {
    generation: u64,
    cancel: CancellationToken,
}

/// Relays presence transitions over the connection registry.
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn DirectoryStore>,
    groups: Arc<dyn GroupStore>,
    grace_period: Duration,
    pending_offline: DashMap<UserId, PendingOffline>,
    statuses: DashMap<UserId, PresenceStatus>,
    generation: AtomicU64,
}

impl std::fmt::Debug for PresenceBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceBroadcaster")
            .field("grace_period", &self.grace_period)
            .field("pending_offline", &self.pending_offline.len())
            .finish()
    }
}

impl PresenceBroadcaster {
    /// Create a broadcaster.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        directory: Arc<dyn DirectoryStore>,
        groups: Arc<dyn GroupStore>,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            directory,
            groups,
            grace_period,
            pending_offline: DashMap::new(),
            statuses: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Handle a newly registered connection.
    ///
    /// Cancels a pending offline broadcast. Peers hear `user_online` only
    /// when this is the user's first connection and they were not inside
    /// a grace period, so a fast reconnect is invisible to them.
    pub async fn user_connected(&self, user_id: UserId, first_connection: bool) {
        let resumed = match self.pending_offline.remove(&user_id) {
            Some((_, pending)) => {
                pending.cancel.cancel();
                debug!(user_id = %user_id, "Reconnected within grace period");
                true
            }
            None => false,
        };

        if first_connection && !resumed {
            self.statuses.insert(user_id, PresenceStatus::Online);
            self.broadcast(
                user_id,
                ServerEvent::UserOnline {
                    user_id,
                    timestamp: Utc::now(),
                },
            )
            .await;
        }
    }

    /// Handle the removal of the user's last connection.
    ///
    /// Schedules `user_offline` after the grace period.
    pub fn user_disconnected(self: &Arc<Self>, user_id: UserId) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let previous = self.pending_offline.insert(
            user_id,
            PendingOffline {
                generation,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(this.grace_period) => {
                    this.expire_grace(user_id, generation).await;
                }
            }
        });
    }

    async fn expire_grace(&self, user_id: UserId, generation: u64) {
        // A connection registered but not yet announced leaves the entry for
        // `user_connected` to claim as a resume.
        let expired = self
            .pending_offline
            .remove_if(&user_id, |_, pending| {
                pending.generation == generation && !self.registry.is_online(user_id)
            })
            .is_some();
        if !expired {
            return;
        }

        self.statuses.remove(&user_id);
        self.broadcast(
            user_id,
            ServerEvent::UserOffline {
                user_id,
                timestamp: Utc::now(),
            },
        )
        .await;
    }

    /// Record a status chosen by the user and relay it to online peers.
    pub async fn update_status(&self, user_id: UserId, status: PresenceStatus) {
        self.statuses.insert(user_id, status);
        self.broadcast(
            user_id,
            ServerEvent::UserStatusUpdate {
                user_id,
                status,
                timestamp: Utc::now(),
            },
        )
        .await;
    }

    /// Current status as peers see it.
    pub fn status_of(&self, user_id: UserId) -> PresenceStatus {
        if !self.registry.is_online(user_id) && !self.pending_offline.contains_key(&user_id) {
            return PresenceStatus::Offline;
        }
        self.statuses
            .get(&user_id)
            .map(|s| *s.value())
            .unwrap_or(PresenceStatus::Online)
    }

    /// Online contacts and shared-group peers of the user.
    pub async fn online_peers(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let mut peers: BTreeSet<UserId> = self
            .directory
            .contacts_of(user_id)
            .await?
            .into_iter()
            .collect();
        for group_id in self.groups.groups_of(user_id).await? {
            peers.extend(self.groups.active_members(group_id).await?);
        }
        peers.remove(&user_id);
        Ok(peers
            .into_iter()
            .filter(|peer| self.registry.is_online(*peer))
            .collect())
    }

    async fn broadcast(&self, user_id: UserId, event: ServerEvent) {
        match self.online_peers(user_id).await {
            Ok(peers) => {
                let delivered = self.registry.send_to_users(&peers, &event);
                debug!(
                    user_id = %user_id,
                    event = event.name(),
                    peers = peers.len(),
                    delivered,
                    "Presence broadcast"
                );
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to resolve presence peers");
            }
        }
    }

    /// Cancel pending broadcasts and forget all statuses.
    pub fn shutdown(&self) {
        for entry in self.pending_offline.iter() {
            entry.value().cancel.cancel();
        }
        self.pending_offline.clear();
        self.statuses.clear();
    }
}
