//! Integration tests for the REST surface: auth, messaging, receipts,
//! groups, notification limits and health.

mod helpers;

use axum::http::StatusCode;
use axum::http::header::RETRY_AFTER;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health/detailed", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["storage"], "memory");
    assert!(response.data()["database"].is_null());
    assert_eq!(response.data()["ws_connections"], 0);
    assert!(response.data()["metrics"].is_object());
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = helpers::TestApp::new();
    let (bob, _) = app.create_test_user("bob");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": "hi" })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "AUTHENTICATION");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": "hi" })),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(app.store.messages().is_empty());
}

#[tokio::test]
async fn test_send_direct_message() {
    let app = helpers::TestApp::new();
    let (alice, token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");

    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": "hello bob" })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let data = response.data();
    assert_eq!(data["sender_id"], json!(alice));
    assert_eq!(data["recipient_id"], json!(bob));
    assert_eq!(data["content"], "hello bob");
    assert_eq!(data["status"], "sent");
    assert_eq!(app.store.messages().len(), 1);
}

#[tokio::test]
async fn test_send_message_rejections() {
    let app = helpers::TestApp::new();
    let (_, token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");
    let carol = app.store.add_user("carol");
    let group = app.store.create_group("team", carol, &[carol]);

    let both = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "group_id": group, "content": "x" })),
            Some(&token),
        )
        .await;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);
    assert_eq!(both.body["error"], "VALIDATION");

    let empty = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": "   " })),
            Some(&token),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let too_long = "a".repeat(app.config.realtime.max_content_length + 1);
    let oversized = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": too_long })),
            Some(&token),
        )
        .await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": uuid::Uuid::now_v7(), "content": "x" })),
            Some(&token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let outsider = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "group_id": group, "content": "x" })),
            Some(&token),
        )
        .await;
    assert_eq!(outsider.status, StatusCode::FORBIDDEN);
    assert_eq!(outsider.body["error"], "AUTHORIZATION");

    assert!(app.store.messages().is_empty());
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let app = helpers::TestApp::new();
    let (_, token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");

    let huge = "a".repeat(app.config.server.max_body_bytes + 1);
    let response = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": huge })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_receipts_flow() {
    let app = helpers::TestApp::new();
    let (_, alice_token) = app.create_test_user("alice");
    let (bob, bob_token) = app.create_test_user("bob");

    let sent = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "recipient_id": bob, "content": "ping" })),
            Some(&alice_token),
        )
        .await;
    let id = sent.data()["id"].as_str().expect("message id").to_string();

    // Only the recipient can advance the status.
    let by_sender = app
        .request(
            "POST",
            &format!("/api/messages/{id}/delivered"),
            None,
            Some(&alice_token),
        )
        .await;
    assert_eq!(by_sender.status, StatusCode::OK);
    assert_eq!(by_sender.data()["updated"], false);

    let delivered = app
        .request(
            "POST",
            &format!("/api/messages/{id}/delivered"),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(delivered.data()["updated"], true);
    assert_eq!(delivered.data()["message"]["status"], "delivered");

    let read = app
        .request(
            "POST",
            &format!("/api/messages/{id}/read"),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(read.data()["message"]["status"], "read");

    // Status never moves backwards.
    let again = app
        .request(
            "POST",
            &format!("/api/messages/{id}/delivered"),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(again.data()["updated"], false);

    let missing = app
        .request(
            "POST",
            &format!("/api/messages/{}/read", uuid::Uuid::now_v7()),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_open_conversation_marks_pending_delivered() {
    let app = helpers::TestApp::new();
    let (alice, alice_token) = app.create_test_user("alice");
    let (bob, bob_token) = app.create_test_user("bob");
    let (_, carol_token) = app.create_test_user("carol");

    for text in ["one", "two"] {
        let response = app
            .request(
                "POST",
                "/api/messages",
                Some(json!({ "recipient_id": bob, "content": text })),
                Some(&alice_token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    // A bystander opening the same peer sees nothing to deliver.
    let other = app
        .request(
            "POST",
            &format!("/api/conversations/{alice}/open"),
            None,
            Some(&carol_token),
        )
        .await;
    assert_eq!(other.data()["delivered"], 0);

    let opened = app
        .request(
            "POST",
            &format!("/api/conversations/{alice}/open"),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(opened.status, StatusCode::OK);
    assert_eq!(opened.data()["delivered"], 2);

    let reopened = app
        .request(
            "POST",
            &format!("/api/conversations/{alice}/open"),
            None,
            Some(&bob_token),
        )
        .await;
    assert_eq!(reopened.data()["delivered"], 0);
}

#[tokio::test]
async fn test_group_join_send_leave() {
    let app = helpers::TestApp::new();
    let (owner, owner_token) = app.create_test_user("owner");
    let (_, token) = app.create_test_user("newcomer");
    let group = app.store.create_group("team", owner, &[owner]);

    let joined = app
        .request("POST", &format!("/api/groups/{group}/join"), None, Some(&token))
        .await;
    assert_eq!(joined.status, StatusCode::OK);

    let sent = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "group_id": group, "content": "hi all" })),
            Some(&token),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.data()["group_id"], json!(group));

    let left = app
        .request("POST", &format!("/api/groups/{group}/leave"), None, Some(&token))
        .await;
    assert_eq!(left.status, StatusCode::OK);
    assert_eq!(left.data()["left"], true);

    let after = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "group_id": group, "content": "still here?" })),
            Some(&token),
        )
        .await;
    assert_eq!(after.status, StatusCode::FORBIDDEN);

    let owner_send = app
        .request(
            "POST",
            "/api/messages",
            Some(json!({ "group_id": group, "content": "bye" })),
            Some(&owner_token),
        )
        .await;
    assert_eq!(owner_send.status, StatusCode::CREATED);

    let unknown = app
        .request(
            "POST",
            &format!("/api/groups/{}/join", uuid::Uuid::now_v7()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notification_actions_are_rate_limited() {
    let app = helpers::TestApp::new();
    let (_, token) = app.create_test_user("alice");
    let limit = app.config.rate_limit.notification_action.per_minute;

    for _ in 0..limit {
        let response = app
            .request(
                "POST",
                "/api/notifications/actions",
                Some(json!({ "action": "mark_all_read" })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
    }

    let denied = app
        .request(
            "POST",
            "/api/notifications/actions",
            Some(json!({ "action": "read", "notification_id": uuid::Uuid::new_v4() })),
            Some(&token),
        )
        .await;

    assert_eq!(denied.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.body["error"], "RATE_LIMIT_EXCEEDED");
    let retry_after: u64 = denied
        .headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header");
    assert!((1..=60).contains(&retry_after));
    assert_eq!(denied.body["retry_after"], json!(retry_after));

    // Limits are per user.
    let (_, other) = app.create_test_user("bob");
    let response = app
        .request(
            "POST",
            "/api/notifications/actions",
            Some(json!({ "action": "mark_all_read" })),
            Some(&other),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_presence_lookup_for_disconnected_user() {
    let app = helpers::TestApp::new();
    let (_, token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");

    let response = app
        .request("GET", &format!("/api/presence/{bob}"), None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "offline");
}
