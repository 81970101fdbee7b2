//! Push notification gateways.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use chathub_core::config::PushConfig;
use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_entity::call::CallSession;
use chathub_entity::message::Message;

/// Notification body handed to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    /// Short title.
    pub title: String,
    /// Preview text.
    pub body: String,
    /// Structured data for the client app.
    pub data: serde_json::Value,
}

impl PushPayload {
    /// Preview of a new message. Long content is cut at 100 characters.
    pub fn new_message(message: &Message) -> Self {
        let mut body: String = message.content.chars().take(100).collect();
        if message.content.chars().count() > 100 {
            body.push_str("...");
        }
        Self {
            title: "New message".to_string(),
            body,
            data: serde_json::json!({
                "type": "message",
                "message_id": message.id,
                "sender_id": message.sender_id,
                "group_id": message.group_id,
            }),
        }
    }

    /// Ring notification for an incoming call.
    pub fn incoming_call(session: &CallSession) -> Self {
        Self {
            title: "Incoming call".to_string(),
            body: "You have an incoming call".to_string(),
            data: serde_json::json!({
                "type": "call.incoming",
                "call_id": session.id,
                "caller_id": session.caller_id,
            }),
        }
    }
}

/// Delivers notifications to device tokens.
#[async_trait]
pub trait PushGateway: Send + Sync + 'static {
    /// Send `payload` to every token.
    async fn dispatch(&self, device_tokens: &[String], payload: &PushPayload) -> AppResult<()>;
}

/// Gateway that only logs. Used in development.
#[derive(Debug, Clone, Default)]
pub struct LogPushGateway;

#[async_trait]
impl PushGateway for LogPushGateway {
    async fn dispatch(&self, device_tokens: &[String], payload: &PushPayload) -> AppResult<()> {
        info!(
            devices = device_tokens.len(),
            title = %payload.title,
            "Push notification (log gateway)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    tokens: &'a [String],
    notification: &'a PushPayload,
}

/// Gateway that POSTs JSON to an external push relay.
#[derive(Debug, Clone)]
pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushGateway {
    /// Build a gateway from configuration.
    pub fn new(config: &PushConfig) -> AppResult<Self> {
        if config.endpoint.is_empty() {
            return Err(AppError::configuration(
                "push.endpoint is required for the http push provider",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build push client", e)
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn dispatch(&self, device_tokens: &[String], payload: &PushPayload) -> AppResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PushRequest {
                tokens: device_tokens,
                notification: payload,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Push gateway unreachable", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(format!(
                "Push gateway responded with {status}"
            )));
        }
        Ok(())
    }
}
