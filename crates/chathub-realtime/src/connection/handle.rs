//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{ConnectionId, UserId};

use crate::message::types::ServerEvent;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing events to the client,
/// plus metadata about the connected user.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Username (cached for display)
    pub username: String,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerEvent>,
    alive: AtomicBool,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        id: ConnectionId,
        user_id: UserId,
        username: String,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Self {
        Self {
            id,
            user_id,
            username,
            connected_at: Utc::now(),
            sender,
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue an event for this connection without waiting.
    ///
    /// A closed receiver marks the handle dead. Both a closed and a full
    /// queue surface as `TransientDelivery`.
    pub fn send(&self, event: ServerEvent) -> AppResult<()> {
        if !self.is_alive() {
            return Err(AppError::transient_delivery(format!(
                "Connection {} is closed",
                self.id
            )));
        }
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(AppError::transient_delivery(
                format!("Connection {} send buffer full", self.id),
            )),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(AppError::transient_delivery(format!(
                    "Connection {} receiver dropped",
                    self.id
                )))
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Mark dead and wake every task waiting on [`ConnectionHandle::closed`].
    pub fn close(&self) {
        self.mark_dead();
        self.closed.cancel();
    }

    /// Resolves once the server has closed this connection.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}
