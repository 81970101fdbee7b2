//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use chathub_api::{AppState, build_app};
use chathub_auth::{JwtDecoder, JwtEncoder};
use chathub_core::config::{AppConfig, StorageBackend};
use chathub_core::types::UserId;
use chathub_database::{MemoryStore, Stores};
use chathub_realtime::connection::WsAuthenticator;
use chathub_realtime::{LogPushGateway, RealtimeEngine};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: RealtimeEngine,
    /// Backing store for seeding users and groups
    pub store: Arc<MemoryStore>,
    /// Token minting
    pub encoder: JwtEncoder,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application over in-memory stores
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with a tweaked config
    pub fn with_config(mut config: AppConfig) -> Self {
        config.database.storage = StorageBackend::Memory;
        config.auth.jwt_secret = "integration-test-secret".to_string();

        let store = Arc::new(MemoryStore::new());
        let engine = RealtimeEngine::new(
            &config,
            Stores::from_single(store.clone()),
            Arc::new(LogPushGateway),
        );
        let authenticator = WsAuthenticator::new(Arc::new(JwtDecoder::new(&config.auth)));
        let encoder = JwtEncoder::new(&config.auth);

        let state = AppState::new(Arc::new(config.clone()), engine.clone(), authenticator);
        let router = build_app(state);

        Self {
            router,
            engine,
            store,
            encoder,
            config,
        }
    }

    /// Seed a user and mint an access token for them
    pub fn create_test_user(&self, username: &str) -> (UserId, String) {
        let user_id = self.store.add_user(username);
        let (token, _) = self
            .encoder
            .generate_access_token(user_id, username)
            .expect("Failed to mint token");
        (user_id, token)
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Serve the app on an ephemeral local port
    pub async fn spawn_server(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}
