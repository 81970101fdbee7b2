//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use chathub_core::config::AppConfig;
use chathub_database::DatabasePool;
use chathub_realtime::RealtimeEngine;
use chathub_realtime::connection::WsAuthenticator;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// WebSocket realtime engine
    pub engine: RealtimeEngine,
    /// Access token check shared by the upgrade and REST paths
    pub authenticator: WsAuthenticator,
    /// Process start, for uptime reporting
    pub started_at: Instant,
    /// Postgres pool, absent with in-memory storage
    pub database: Option<DatabasePool>,
}

impl AppState {
    /// Assemble the state.
    pub fn new(config: Arc<AppConfig>, engine: RealtimeEngine, authenticator: WsAuthenticator) -> Self {
        Self {
            config,
            engine,
            authenticator,
            started_at: Instant::now(),
            database: None,
        }
    }

    /// Attach the database pool checked by the detailed health endpoint.
    pub fn with_database(mut self, pool: DatabasePool) -> Self {
        self.database = Some(pool);
        self
    }
}
