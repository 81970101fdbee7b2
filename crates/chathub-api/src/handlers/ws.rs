//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use chathub_realtime::connection::AuthenticatedUser;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?token={jwt}: WebSocket upgrade
///
/// The token is checked before the upgrade; a bad token gets 401 and no
/// connection is registered.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let token = query.token.unwrap_or_default();
    let user = state.authenticator.authenticate(&token)?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, user, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, user: AuthenticatedUser, socket: WebSocket) {
    let registration = match state.engine.connect(&user).await {
        Ok(registration) => registration,
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "Failed to register WebSocket connection");
            return;
        }
    };
    let handle = registration.handle;
    let mut outbound_rx = registration.receiver;
    let conn_id = handle.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    info!(
        conn_id = %conn_id,
        user_id = %user.user_id,
        "WebSocket connection established"
    );

    // Spawn outbound event forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Process inbound frames until the client leaves or the server closes us
    loop {
        tokio::select! {
            _ = handle.closed() => {
                debug!(conn_id = %conn_id, "Connection closed by server");
                break;
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.engine.handle_inbound(conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    state.engine.disconnect(conn_id).await;
    outbound_task.abort();

    info!(
        conn_id = %conn_id,
        user_id = %user.user_id,
        "WebSocket connection closed"
    );
}
