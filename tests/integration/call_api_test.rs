//! Integration tests for call signalling over REST.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use chathub_entity::message::MessageKind;

async fn place_call(
    app: &helpers::TestApp,
    token: &str,
    recipient: impl std::fmt::Display,
) -> helpers::TestResponse {
    app.request(
        "POST",
        "/api/calls",
        Some(json!({ "recipient_id": recipient.to_string() })),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn test_call_lifecycle() {
    let app = helpers::TestApp::new();
    let (alice, alice_token) = app.create_test_user("alice");
    let (bob, bob_token) = app.create_test_user("bob");

    let placed = place_call(&app, &alice_token, bob).await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(placed.data()["status"], "calling");
    assert_eq!(placed.data()["caller_id"], json!(alice));
    let id = placed.data()["id"].as_str().expect("call id").to_string();

    let accepted = app
        .request("POST", &format!("/api/calls/{id}/accept"), None, Some(&bob_token))
        .await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.data()["status"], "connected");
    assert!(accepted.data()["started_at"].is_string());

    let fetched = app
        .request("GET", &format!("/api/calls/{id}"), None, Some(&alice_token))
        .await;
    assert_eq!(fetched.data()["status"], "connected");

    let ended = app
        .request("POST", &format!("/api/calls/{id}/end"), None, Some(&alice_token))
        .await;
    assert_eq!(ended.status, StatusCode::OK);
    assert_eq!(ended.data()["status"], "ended");
    assert_eq!(ended.data()["end_reason"], "hangup");
    assert!(ended.data()["duration_seconds"].as_i64().is_some());

    let again = app
        .request("POST", &format!("/api/calls/{id}/end"), None, Some(&bob_token))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let history: Vec<_> = app
        .store
        .messages()
        .into_iter()
        .filter(|m| m.kind == MessageKind::Call)
        .collect();
    assert_eq!(history.len(), 1);
    assert!(history[0].content.starts_with("Call ended ("));
}

#[tokio::test]
async fn test_reject_records_declined_call() {
    let app = helpers::TestApp::new();
    let (_, alice_token) = app.create_test_user("alice");
    let (bob, bob_token) = app.create_test_user("bob");

    let placed = place_call(&app, &alice_token, bob).await;
    let id = placed.data()["id"].as_str().expect("call id").to_string();

    // The caller cannot answer their own call.
    let by_caller = app
        .request("POST", &format!("/api/calls/{id}/reject"), None, Some(&alice_token))
        .await;
    assert_eq!(by_caller.status, StatusCode::FORBIDDEN);

    let rejected = app
        .request("POST", &format!("/api/calls/{id}/reject"), None, Some(&bob_token))
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.data()["status"], "rejected");

    let late_accept = app
        .request("POST", &format!("/api/calls/{id}/accept"), None, Some(&bob_token))
        .await;
    assert_eq!(late_accept.status, StatusCode::CONFLICT);

    let contents: Vec<String> = app
        .store
        .messages()
        .into_iter()
        .filter(|m| m.kind == MessageKind::Call)
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["Call declined".to_string()]);
}

#[tokio::test]
async fn test_initiate_rejections() {
    let app = helpers::TestApp::new();
    let (alice, alice_token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");
    let (_, carol_token) = app.create_test_user("carol");

    let self_call = place_call(&app, &alice_token, alice).await;
    assert_eq!(self_call.status, StatusCode::BAD_REQUEST);

    let unknown = place_call(&app, &alice_token, uuid::Uuid::now_v7()).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let first = place_call(&app, &alice_token, bob).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let id = first.data()["id"].as_str().expect("call id").to_string();

    let busy = place_call(&app, &carol_token, bob).await;
    assert_eq!(busy.status, StatusCode::CONFLICT);

    let foreign = app
        .request("GET", &format!("/api/calls/{id}"), None, Some(&carol_token))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_caller_hangup_while_ringing_is_missed() {
    let app = helpers::TestApp::new();
    let (_, alice_token) = app.create_test_user("alice");
    let (bob, _) = app.create_test_user("bob");

    let placed = place_call(&app, &alice_token, bob).await;
    let id = placed.data()["id"].as_str().expect("call id").to_string();

    let ended = app
        .request("POST", &format!("/api/calls/{id}/end"), None, Some(&alice_token))
        .await;
    assert_eq!(ended.status, StatusCode::OK);
    assert_eq!(ended.data()["status"], "missed");
    assert!(ended.data()["duration_seconds"].is_null());

    // Both parties are free again.
    let redial = place_call(&app, &alice_token, bob).await;
    assert_eq!(redial.status, StatusCode::CREATED);
}
