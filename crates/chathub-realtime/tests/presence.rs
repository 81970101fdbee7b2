mod common;

use std::time::Duration;

use chathub_core::error::ErrorKind;
use chathub_core::types::ConnectionId;
use chathub_entity::message::MessageTarget;
use chathub_realtime::presence::PresenceStatus;
use chathub_realtime::ServerEvent;

use common::{Harness, drain, names, settle};

#[tokio::test(start_paused = true)]
async fn test_contacts_hear_online_and_debounced_offline() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    h.store.add_contacts(alice, bob);

    let mut b = h.connect(bob).await;
    settle().await;
    drain(&mut b.receiver);

    let a = h.connect(alice).await;
    settle().await;
    let events = drain(&mut b.receiver);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::UserOnline { user_id, .. } if user_id == alice));

    h.engine.disconnect(a.handle.id).await;
    settle().await;
    assert!(drain(&mut b.receiver).is_empty(), "offline waits for the grace period");
    assert_eq!(h.engine.presence.status_of(alice), PresenceStatus::Online);

    tokio::time::advance(Duration::from_millis(5100)).await;
    settle().await;
    let events = drain(&mut b.receiver);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::UserOffline { user_id, .. } if user_id == alice));
    assert_eq!(h.engine.presence.status_of(alice), PresenceStatus::Offline);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_is_invisible_to_peers() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    h.store.add_contacts(alice, bob);

    let mut b = h.connect(bob).await;
    let a = h.connect(alice).await;
    settle().await;
    drain(&mut b.receiver);

    h.engine.disconnect(a.handle.id).await;
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;

    let _a2 = h.connect(alice).await;
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;

    assert!(drain(&mut b.receiver).is_empty());
    assert!(h.engine.registry.is_online(alice));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_registered_as_grace_expires_stays_silent() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    h.store.add_contacts(alice, bob);

    let mut b = h.connect(bob).await;
    let a = h.connect(alice).await;
    settle().await;
    drain(&mut b.receiver);

    h.engine.disconnect(a.handle.id).await;

    // The socket is registered before the grace timer fires but announced
    // only afterwards.
    let reconnect = h
        .engine
        .registry
        .register(alice, ConnectionId::new(), "alice")
        .expect("register");
    tokio::time::advance(Duration::from_millis(5100)).await;
    settle().await;
    assert!(drain(&mut b.receiver).is_empty());

    h.engine
        .presence
        .user_connected(alice, reconnect.first_connection)
        .await;
    settle().await;

    assert!(drain(&mut b.receiver).is_empty(), "peers never saw alice leave");
    assert_eq!(h.engine.presence.status_of(alice), PresenceStatus::Online);
}

#[tokio::test(start_paused = true)]
async fn test_closing_one_of_several_devices_keeps_user_online() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    h.store.add_contacts(alice, bob);

    let mut b = h.connect(bob).await;
    let phone = h.connect(alice).await;
    let _laptop = h.connect(alice).await;
    settle().await;
    drain(&mut b.receiver);

    h.engine.disconnect(phone.handle.id).await;
    tokio::time::advance(Duration::from_secs(6)).await;
    settle().await;

    assert!(drain(&mut b.receiver).is_empty());
    assert_eq!(h.engine.registry.connections_for(alice).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_group_peers_receive_status_updates() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let stranger = h.user("stranger");
    h.store.create_group("team", alice, &[alice, bob]);

    let mut b = h.connect(bob).await;
    let mut s = h.connect(stranger).await;
    let _a = h.connect(alice).await;
    settle().await;
    drain(&mut b.receiver);
    drain(&mut s.receiver);

    h.engine
        .presence
        .update_status(alice, PresenceStatus::Away)
        .await;

    assert_eq!(names(&mut b.receiver), vec!["user_status_update"]);
    assert!(drain(&mut s.receiver).is_empty());
    assert_eq!(h.engine.presence.status_of(alice), PresenceStatus::Away);
}

#[tokio::test(start_paused = true)]
async fn test_typing_is_throttled_and_stops_automatically() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let mut b = h.connect(bob).await;
    drain(&mut b.receiver);
    let target = MessageTarget::Direct(bob);

    h.engine.typing.handle(alice, target, true).await.expect("typing");
    h.engine.typing.handle(alice, target, true).await.expect("typing");
    assert_eq!(names(&mut b.receiver), vec!["typing"]);

    tokio::time::advance(Duration::from_millis(1100)).await;
    h.engine.typing.handle(alice, target, true).await.expect("typing");
    assert_eq!(names(&mut b.receiver), vec!["typing"]);

    tokio::time::advance(Duration::from_millis(2500)).await;
    settle().await;
    assert!(drain(&mut b.receiver).is_empty(), "timer was restarted");

    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;
    assert_eq!(names(&mut b.receiver), vec!["stop_typing"]);
    assert!(!h.engine.typing.is_typing(alice, target));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_stop_and_disconnect_clear_typing() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let mut b = h.connect(bob).await;
    let a = h.connect(alice).await;
    settle().await;
    drain(&mut b.receiver);
    let target = MessageTarget::Direct(bob);

    h.engine.typing.handle(alice, target, true).await.expect("typing");
    h.engine.typing.handle(alice, target, false).await.expect("stop");
    assert_eq!(names(&mut b.receiver), vec!["typing", "stop_typing"]);

    tokio::time::advance(Duration::from_millis(1100)).await;
    h.engine.typing.handle(alice, target, true).await.expect("typing");
    drain(&mut b.receiver);

    h.engine.disconnect(a.handle.id).await;
    assert_eq!(names(&mut b.receiver), vec!["stop_typing"]);

    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    assert!(drain(&mut b.receiver).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_group_typing_requires_membership() {
    let h = Harness::new();
    let alice = h.user("alice");
    let bob = h.user("bob");
    let outsider = h.user("outsider");
    let group = h.store.create_group("team", alice, &[alice, bob]);
    let mut b = h.connect(bob).await;
    drain(&mut b.receiver);

    let err = h
        .engine
        .typing
        .handle(outsider, MessageTarget::Group(group), true)
        .await
        .expect_err("not a member");
    assert_eq!(err.kind, ErrorKind::Authorization);

    h.engine
        .typing
        .handle(alice, MessageTarget::Group(group), true)
        .await
        .expect("member");
    let events = drain(&mut b.receiver);
    assert!(matches!(
        events.as_slice(),
        [ServerEvent::Typing { group_id: Some(g), .. }] if *g == group
    ));
}
