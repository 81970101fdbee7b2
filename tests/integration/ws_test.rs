//! Integration tests for the WebSocket endpoint over a real socket.

mod helpers;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn open(addr: std::net::SocketAddr, token: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .expect("WebSocket handshake failed");
    socket
}

/// Next server event of the given type, skipping everything else.
async fn next_of_type(socket: &mut Socket, event_type: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = socket
                .next()
                .await
                .expect("socket closed")
                .expect("socket error");
            if let Message::Text(text) = frame {
                let event: Value = serde_json::from_str(text.as_str()).expect("invalid JSON");
                if event["type"] == event_type {
                    return event;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
}

async fn send(socket: &mut Socket, event: Value) {
    socket
        .send(Message::text(event.to_string()))
        .await
        .expect("send failed");
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = helpers::TestApp::new();
    let addr = app.spawn_server().await;

    let result = connect_async(format!("ws://{addr}/ws")).await;

    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("expected 401, got {e}"),
        Ok(_) => panic!("expected 401, handshake succeeded"),
    }
    assert_eq!(app.engine.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_ws_upgrade_with_invalid_token() {
    let app = helpers::TestApp::new();
    let addr = app.spawn_server().await;

    let result = connect_async(format!("ws://{addr}/ws?token=garbage")).await;

    assert!(matches!(result, Err(WsError::Http(ref r)) if r.status() == 401));
}

#[tokio::test]
async fn test_ws_message_round_trip() {
    let app = helpers::TestApp::new();
    let (alice, alice_token) = app.create_test_user("alice");
    let (bob, bob_token) = app.create_test_user("bob");
    let addr = app.spawn_server().await;

    let mut alice_ws = open(addr, &alice_token).await;
    let hello = next_of_type(&mut alice_ws, "authenticated").await;
    assert_eq!(hello["user_id"], json!(alice));
    assert_eq!(hello["username"], "alice");

    let mut bob_ws = open(addr, &bob_token).await;
    next_of_type(&mut bob_ws, "authenticated").await;

    send(
        &mut alice_ws,
        json!({
            "type": "message_send",
            "recipient_id": bob,
            "content": "over the wire",
            "client_id": "c-1"
        }),
    )
    .await;

    let ack = next_of_type(&mut alice_ws, "message_sent").await;
    assert_eq!(ack["client_id"], "c-1");
    assert_eq!(ack["message"]["content"], "over the wire");

    let received = next_of_type(&mut bob_ws, "message").await;
    assert_eq!(received["message"]["sender_id"], json!(alice));
    let message_id = received["message"]["id"].clone();

    send(
        &mut bob_ws,
        json!({ "type": "message_read", "message_id": message_id }),
    )
    .await;
    let read = next_of_type(&mut alice_ws, "message_read").await;
    assert_eq!(read["message_id"], message_id);
    assert_eq!(read["user_id"], json!(bob));
}

#[tokio::test]
async fn test_ws_bad_frames_keep_connection_open() {
    let app = helpers::TestApp::new();
    let (_, token) = app.create_test_user("alice");
    let addr = app.spawn_server().await;

    let mut ws = open(addr, &token).await;
    next_of_type(&mut ws, "authenticated").await;

    ws.send(Message::text("{not json")).await.expect("send failed");
    let error = next_of_type(&mut ws, "error").await;
    assert_eq!(error["code"], "INVALID_MESSAGE");

    send(&mut ws, json!({ "type": "heartbeat" })).await;
    next_of_type(&mut ws, "pong").await;
}

#[tokio::test]
async fn test_ws_close_unregisters_connection() {
    let app = helpers::TestApp::new();
    let (alice, token) = app.create_test_user("alice");
    let addr = app.spawn_server().await;

    let mut ws = open(addr, &token).await;
    next_of_type(&mut ws, "authenticated").await;
    assert!(app.engine.registry.is_online(alice));

    ws.close(None).await.expect("close failed");

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while app.engine.registry.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "connection was not unregistered");
    assert!(!app.engine.registry.is_online(alice));
}
