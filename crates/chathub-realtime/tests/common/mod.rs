//! Shared harness for engine tests: an in-memory store, a recording push
//! gateway and helpers to read what a socket would have received.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use chathub_core::config::AppConfig;
use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_database::{MemoryStore, Stores};
use chathub_realtime::connection::{AuthenticatedUser, Registration};
use chathub_realtime::{PushGateway, PushPayload, RealtimeEngine, ServerEvent};

/// Gateway that remembers every dispatch.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<(Vec<String>, PushPayload)>>,
}

impl RecordingGateway {
    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn payloads(&self) -> Vec<PushPayload> {
        self.sent
            .lock()
            .map(|s| s.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn dispatch(&self, tokens: &[String], payload: &PushPayload) -> AppResult<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((tokens.to_vec(), payload.clone()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub engine: RealtimeEngine,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<RecordingGateway>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let engine = RealtimeEngine::new(
            &config,
            Stores::from_single(store.clone()),
            gateway.clone(),
        );
        Self {
            engine,
            store,
            gateway,
        }
    }

    pub fn user(&self, name: &str) -> UserId {
        self.store.add_user(name)
    }

    pub async fn connect(&self, user_id: UserId) -> Registration {
        let username = self.store.username(user_id).unwrap_or_default();
        self.engine
            .connect(&AuthenticatedUser { user_id, username })
            .await
            .expect("connect")
    }
}

/// Let spawned tasks run to their next await point.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Everything queued for a socket so far, minus keepalives.
pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, ServerEvent::Heartbeat { .. }) {
            events.push(event);
        }
    }
    events
}

/// Wire names of the drained events.
pub fn names(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<&'static str> {
    drain(rx).iter().map(ServerEvent::name).collect()
}
