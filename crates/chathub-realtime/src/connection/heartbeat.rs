//! Server keepalive for WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::debug;

use crate::message::types::ServerEvent;

use super::handle::ConnectionHandle;

/// Run the heartbeat loop for a connection.
///
/// Emits `heartbeat` every `interval`. Returns once the connection is
/// closed or an event can no longer be queued; the caller unregisters it.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, interval: Duration) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = ticker.tick() => {}
        }

        if !handle.is_alive() {
            break;
        }

        let beat = ServerEvent::Heartbeat {
            timestamp: Utc::now(),
        };
        if let Err(e) = handle.send(beat) {
            if !handle.is_alive() {
                debug!(conn_id = %handle.id, error = %e, "Heartbeat send failed, connection dead");
                break;
            }
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
