//! Connection registry: which users are online and through which connections.
//!
//! A connection id maps to exactly one user. A user with at least one
//! registered connection is online. The registry only does bookkeeping;
//! the presence broadcaster decides what peers hear about it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chathub_core::config::RealtimeConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{ConnectionId, UserId};

use crate::message::types::ServerEvent;
use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// Result of registering a connection.
#[derive(Debug)]
pub struct Registration {
    /// The new connection.
    pub handle: Arc<ConnectionHandle>,
    /// Outbound events for the socket writer.
    pub receiver: mpsc::Receiver<ServerEvent>,
    /// The user went from zero to one connection.
    pub first_connection: bool,
    /// Oldest connection closed to stay under the per-user cap.
    pub evicted: Option<Arc<ConnectionHandle>>,
}

/// Result of unregistering a connection.
#[derive(Debug)]
pub struct Unregistered {
    /// The removed connection.
    pub handle: Arc<ConnectionHandle>,
    /// The user has no connections left.
    pub last_connection: bool,
}

/// Process-wide map of live connections. Empty on start.
#[derive(Debug)]
pub struct ConnectionRegistry {
    pool: ConnectionPool,
    max_connections_per_user: usize,
    channel_buffer_size: usize,
    metrics: Arc<RealtimeMetrics>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(config: &RealtimeConfig, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            pool: ConnectionPool::new(),
            max_connections_per_user: config.max_connections_per_user.max(1),
            channel_buffer_size: config.channel_buffer_size.max(1),
            metrics,
        }
    }

    /// Registers an authenticated connection.
    ///
    /// When the user is at the connection cap the oldest connection is
    /// closed first. Fails with `Conflict` if `connection_id` is taken.
    pub fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        username: &str,
    ) -> AppResult<Registration> {
        let existing = self.pool.get_user_connections(&user_id);
        let evicted = if existing.len() >= self.max_connections_per_user {
            let oldest = existing.first().cloned();
            if let Some(oldest) = &oldest {
                warn!(
                    user_id = %user_id,
                    conn_id = %oldest.id,
                    max = self.max_connections_per_user,
                    "User at max connections, closing oldest"
                );
                oldest.close();
                if self.pool.remove(&oldest.id).is_some() {
                    self.metrics.connection_closed();
                }
            }
            oldest
        } else {
            None
        };

        let (tx, rx) = mpsc::channel(self.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(
            connection_id,
            user_id,
            username.to_string(),
            tx,
        ));

        let count = self.pool.add(handle.clone()).ok_or_else(|| {
            AppError::conflict(format!("Connection {connection_id} is already registered"))
        })?;
        self.metrics.connection_opened();

        info!(
            conn_id = %connection_id,
            user_id = %user_id,
            connections = count,
            "WebSocket connection registered"
        );

        Ok(Registration {
            handle,
            receiver: rx,
            first_connection: count == 1,
            evicted,
        })
    }

    /// Unregisters a connection. Returns `None` if it was already gone.
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<Unregistered> {
        let (handle, remaining) = self.pool.remove(connection_id)?;
        handle.close();
        self.metrics.connection_closed();

        info!(
            conn_id = %connection_id,
            user_id = %handle.user_id,
            remaining,
            "WebSocket connection unregistered"
        );

        Some(Unregistered {
            handle,
            last_connection: remaining == 0,
        })
    }

    /// Ids of the user's live connections.
    pub fn connections_for(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.pool
            .get_user_connections(&user_id)
            .iter()
            .map(|c| c.id)
            .collect()
    }

    /// Whether the user has at least one live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.pool.has_user(&user_id)
    }

    /// Gets a connection by id.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(connection_id)
    }

    /// Queue an event on every connection of the user.
    ///
    /// Returns how many connections accepted it. Failures are logged and
    /// counted, never propagated.
    pub fn send_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let connections = self.pool.get_user_connections(&user_id);
        let mut delivered = 0;
        for conn in &connections {
            match conn.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    RealtimeMetrics::inc(&self.metrics.deliveries_failed);
                    warn!(
                        conn_id = %conn.id,
                        user_id = %user_id,
                        event = event.name(),
                        error = %e,
                        "Failed to deliver event"
                    );
                }
            }
        }
        RealtimeMetrics::add(&self.metrics.events_sent, delivered as u64);
        delivered
    }

    /// Queue an event on every connection of each user in `user_ids`.
    pub fn send_to_users(&self, user_ids: &[UserId], event: &ServerEvent) -> usize {
        user_ids
            .iter()
            .map(|user_id| self.send_to_user(*user_id, event))
            .sum()
    }

    /// Queue an event on one connection.
    pub fn send_to_connection(
        &self,
        connection_id: &ConnectionId,
        event: ServerEvent,
    ) -> AppResult<()> {
        let conn = self
            .pool
            .get(connection_id)
            .ok_or_else(|| AppError::not_found(format!("Connection {connection_id} not found")))?;
        let result = conn.send(event);
        match &result {
            Ok(()) => RealtimeMetrics::inc(&self.metrics.events_sent),
            Err(_) => RealtimeMetrics::inc(&self.metrics.deliveries_failed),
        }
        result
    }

    /// Closes and forgets every connection.
    pub fn close_all(&self) {
        let all = self.pool.drain();
        for conn in &all {
            conn.close();
            self.metrics.connection_closed();
        }
        debug!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn registry(max: usize) -> ConnectionRegistry {
        let config = RealtimeConfig {
            max_connections_per_user: max,
            ..RealtimeConfig::default()
        };
        ConnectionRegistry::new(&config, Arc::new(RealtimeMetrics::new()))
    }

    #[test]
    fn test_multi_device_online_until_last_disconnect() {
        let registry = registry(10);
        let user = UserId::new();

        let phone = registry.register(user, ConnectionId::new(), "a").unwrap();
        let laptop = registry.register(user, ConnectionId::new(), "a").unwrap();
        assert!(phone.first_connection);
        assert!(!laptop.first_connection);
        assert_eq!(registry.connections_for(user).len(), 2);

        let first = registry.unregister(&phone.handle.id).unwrap();
        assert!(!first.last_connection);
        assert!(registry.is_online(user));

        let second = registry.unregister(&laptop.handle.id).unwrap();
        assert!(second.last_connection);
        assert!(!registry.is_online(user));
        assert!(registry.unregister(&laptop.handle.id).is_none());
    }

    #[test]
    fn test_duplicate_connection_id_is_rejected() {
        let registry = registry(10);
        let id = ConnectionId::new();
        let _keep = registry.register(UserId::new(), id, "a").unwrap();
        assert!(registry.register(UserId::new(), id, "b").is_err());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let registry = registry(2);
        let user = UserId::new();
        let first = registry.register(user, ConnectionId::new(), "a").unwrap();
        let _second = registry.register(user, ConnectionId::new(), "a").unwrap();
        let third = registry.register(user, ConnectionId::new(), "a").unwrap();

        assert_eq!(third.evicted.as_ref().map(|h| h.id), Some(first.handle.id));
        assert!(!first.handle.is_alive());
        assert_eq!(registry.connections_for(user).len(), 2);
    }

    #[test]
    fn test_send_to_user_reaches_every_device() {
        let registry = registry(10);
        let user = UserId::new();
        let mut a = registry.register(user, ConnectionId::new(), "a").unwrap();
        let mut b = registry.register(user, ConnectionId::new(), "a").unwrap();

        let event = ServerEvent::Pong {
            timestamp: Utc::now(),
        };
        assert_eq!(registry.send_to_user(user, &event), 2);
        assert!(matches!(a.receiver.try_recv(), Ok(ServerEvent::Pong { .. })));
        assert!(matches!(b.receiver.try_recv(), Ok(ServerEvent::Pong { .. })));

        drop(b.receiver);
        assert_eq!(registry.send_to_user(user, &event), 1);
    }
}
