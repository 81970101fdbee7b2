mod common;

use chrono::{Duration, Utc};

use chathub_core::error::ErrorKind;
use chathub_database::CallStore;
use chathub_entity::call::{CallEndReason, CallSession, CallStatus};
use chathub_entity::message::MessageKind;
use chathub_realtime::ServerEvent;

use common::{Harness, drain, names, settle};

#[tokio::test(start_paused = true)]
async fn test_call_lifecycle_accept_then_hang_up() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let mut a = h.connect(alice).await;
    let mut b = h.connect(bob).await;
    drain(&mut a.receiver);
    drain(&mut b.receiver);

    let call = h.engine.calls.initiate(alice, bob).await.expect("initiate");
    assert_eq!(call.status, CallStatus::Calling);
    let events = drain(&mut b.receiver);
    assert!(matches!(
        events.as_slice(),
        [ServerEvent::CallIncoming { call_id, caller_id, .. }] if *call_id == call.id && *caller_id == alice
    ));

    let connected = h.engine.calls.accept(call.id, bob).await.expect("accept");
    assert_eq!(connected.status, CallStatus::Connected);
    assert!(connected.started_at.is_some());
    assert_eq!(names(&mut a.receiver), vec!["call.response"]);
    assert_eq!(names(&mut b.receiver), vec!["call.response"]);

    let ended = h.engine.calls.end(call.id, alice).await.expect("end");
    assert_eq!(ended.status, CallStatus::Ended);
    assert_eq!(ended.end_reason, Some(CallEndReason::Hangup));
    assert!(ended.duration_seconds.is_some());
    assert_eq!(names(&mut a.receiver), vec!["call.ended", "message"]);
    assert_eq!(names(&mut b.receiver), vec!["call.ended", "message"]);

    let history = h.store.messages();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, MessageKind::Call);
    assert!(history[0].content.starts_with("Call ended ("));

    let err = h.engine.calls.end(call.id, bob).await.expect_err("already ended");
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test(start_paused = true)]
async fn test_reject_and_caller_hangup_while_ringing() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");

    let call = h.engine.calls.initiate(alice, bob).await.expect("initiate");
    let err = h.engine.calls.reject(call.id, alice).await.expect_err("caller cannot reject");
    assert_eq!(err.kind, ErrorKind::Authorization);

    let rejected = h.engine.calls.reject(call.id, bob).await.expect("reject");
    assert_eq!(rejected.status, CallStatus::Rejected);
    assert_eq!(rejected.duration_seconds, None);

    let call = h.engine.calls.initiate(alice, bob).await.expect("line is free again");
    let missed = h.engine.calls.end(call.id, alice).await.expect("hang up");
    assert_eq!(missed.status, CallStatus::Missed);
    assert_eq!(missed.end_reason, Some(CallEndReason::Hangup));

    let contents: Vec<String> = h.store.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["Call declined", "Missed call"]);
}

#[tokio::test(start_paused = true)]
async fn test_initiate_rejections() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let carol = h.user("carol");

    let err = h.engine.calls.initiate(alice, alice).await.expect_err("self");
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = h
        .engine
        .calls
        .initiate(alice, chathub_core::types::UserId::new())
        .await
        .expect_err("unknown");
    assert_eq!(err.kind, ErrorKind::NotFound);

    h.engine.calls.initiate(alice, bob).await.expect("initiate");
    let err = h.engine.calls.initiate(carol, bob).await.expect_err("busy");
    assert_eq!(err.kind, ErrorKind::Conflict);
    let err = h.engine.calls.initiate(alice, carol).await.expect_err("caller busy");
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_to_one_recipient_ring_once() {
    let h = Harness::new();
    let bob = h.user("bob");

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = h.engine.clone();
        let caller = h.user(&format!("caller-{i}"));
        tasks.push(tokio::spawn(async move {
            engine.calls.initiate(caller, bob).await
        }));
    }

    let mut rung = 0;
    for task in tasks {
        match task.await.expect("task") {
            Ok(_) => rung += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::Conflict),
        }
    }
    assert_eq!(rung, 1);
}

#[tokio::test(start_paused = true)]
async fn test_offline_callee_is_pushed() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    h.store.add_device(bob, "bob-token");

    h.engine.calls.initiate(alice, bob).await.expect("initiate");
    settle().await;

    let payloads = h.gateway.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].title, "Incoming call");
}

#[tokio::test(start_paused = true)]
async fn test_sweep_misses_unanswered_calls() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let mut b = h.connect(bob).await;
    drain(&mut b.receiver);

    let now = Utc::now();
    let stale = CallSession::ringing(alice, bob, now - Duration::seconds(90));
    let fresh = CallSession::ringing(h.user("carol"), h.user("dave"), now - Duration::seconds(10));
    h.store.insert_call(stale.clone());
    h.store.insert_call(fresh.clone());

    let summary = h.engine.calls.sweep(now).await.expect("sweep");
    assert_eq!(summary.missed, 1);
    assert_eq!(summary.ended, 0);

    let stale = CallStore::find_by_id(&*h.store, stale.id).await.expect("find").expect("exists");
    assert_eq!(stale.status, CallStatus::Missed);
    assert_eq!(stale.end_reason, Some(CallEndReason::Timeout));
    assert_eq!(stale.ended_at, Some(now));
    assert_eq!(stale.duration_seconds, None);
    assert_eq!(names(&mut b.receiver), vec!["call.missed", "message"]);

    let fresh = CallStore::find_by_id(&*h.store, fresh.id).await.expect("find").expect("exists");
    assert_eq!(fresh.status, CallStatus::Calling);
    assert_eq!(h.engine.metrics_snapshot().calls_missed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_continues_past_a_failed_write() {
    let h = Harness::new();
    let now = Utc::now();
    let broken = CallSession::ringing(h.user("alice"), h.user("bob"), now - Duration::seconds(90));
    let healthy = CallSession::ringing(h.user("carol"), h.user("dave"), now - Duration::seconds(90));
    h.store.insert_call(broken.clone());
    h.store.insert_call(healthy.clone());
    h.store.fail_call_transitions(broken.id);

    let summary = h.engine.calls.sweep(now).await.expect("sweep");
    assert_eq!(summary.missed, 1);
    assert_eq!(summary.skipped, 1);

    let healthy = CallStore::find_by_id(&*h.store, healthy.id).await.expect("find").expect("exists");
    assert_eq!(healthy.status, CallStatus::Missed);
    let broken = CallStore::find_by_id(&*h.store, broken.id).await.expect("find").expect("exists");
    assert_eq!(broken.status, CallStatus::Calling);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_caps_long_calls_at_max_duration() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");

    let now = Utc::now();
    let started = now - Duration::seconds(4000);
    let mut call = CallSession::ringing(alice, bob, started - Duration::seconds(5));
    call.status = CallStatus::Connected;
    call.started_at = Some(started);
    h.store.insert_call(call.clone());

    let summary = h.engine.calls.sweep(now).await.expect("sweep");
    assert_eq!(summary.ended, 1);

    let ended = CallStore::find_by_id(&*h.store, call.id).await.expect("find").expect("exists");
    assert_eq!(ended.status, CallStatus::Ended);
    assert_eq!(ended.end_reason, Some(CallEndReason::Timeout));
    assert_eq!(ended.duration_seconds, Some(3600));
    assert_eq!(ended.ended_at, Some(started + Duration::seconds(3600)));
}

#[tokio::test(start_paused = true)]
async fn test_accept_racing_sweep_settles_once() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");

    let now = Utc::now();
    let call = CallSession::ringing(alice, bob, now - Duration::seconds(120));
    h.store.insert_call(call.clone());

    let (accepted, swept) = tokio::join!(
        h.engine.calls.accept(call.id, bob),
        h.engine.calls.sweep(now)
    );
    let swept = swept.expect("sweep");

    let stored = CallStore::find_by_id(&*h.store, call.id).await.expect("find").expect("exists");
    match accepted {
        Ok(session) => {
            assert_eq!(session.status, CallStatus::Connected);
            assert_eq!(stored.status, CallStatus::Connected);
            assert_eq!(swept.missed, 0);
        }
        Err(e) => {
            assert_eq!(e.kind, ErrorKind::Conflict);
            assert_eq!(stored.status, CallStatus::Missed);
            assert_eq!(swept.missed, 1);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_only_participants_may_touch_a_call() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let mallory = h.user("mallory");

    let call = h.engine.calls.initiate(alice, bob).await.expect("initiate");
    let err = h.engine.calls.end(call.id, mallory).await.expect_err("outsider");
    assert_eq!(err.kind, ErrorKind::Authorization);
    let err = h.engine.calls.accept(call.id, alice).await.expect_err("caller");
    assert_eq!(err.kind, ErrorKind::Authorization);
    let err = h.engine.calls.get(call.id, mallory).await.expect_err("outsider");
    assert_eq!(err.kind, ErrorKind::Authorization);
}
