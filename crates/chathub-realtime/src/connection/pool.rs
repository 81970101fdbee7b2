//! Connection pool: tracks all active connections indexed by user ID.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use chathub_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → connection handles, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. Returns the user's connection count afterwards,
    /// or `None` if the connection id is already taken.
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> Option<usize> {
        let mut connections = self.by_user.entry(handle.user_id).or_default();
        match self.by_id.entry(handle.id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(handle.clone());
                connections.push(handle);
                Some(connections.len())
            }
        }
    }

    /// Removes a connection. Returns the handle and how many connections
    /// the user still has.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<(Arc<ConnectionHandle>, usize)> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        let remaining = match self.by_user.get_mut(&handle.user_id) {
            Some(mut connections) => {
                connections.retain(|c| c.id != *conn_id);
                connections.len()
            }
            None => 0,
        };
        if remaining == 0 {
            self.by_user
                .remove_if(&handle.user_id, |_, connections| connections.is_empty());
        }
        Some((handle, remaining))
    }

    /// Gets all connections for a user, oldest first.
    pub fn get_user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Whether the user has at least one connection.
    pub fn has_user(&self, user_id: &UserId) -> bool {
        self.by_user
            .get(user_id)
            .is_some_and(|connections| !connections.is_empty())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Removes every connection and returns the handles.
    pub fn drain(&self) -> Vec<Arc<ConnectionHandle>> {
        let all: Vec<Arc<ConnectionHandle>> =
            self.by_id.iter().map(|entry| entry.value().clone()).collect();
        self.by_id.clear();
        self.by_user.clear();
        all
    }
}
