//! Relay loop tests over channel-backed sockets

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use chat_relay::domain::MessageRepository;

use crate::common::{direct_chat, seed_user, wait_until, RelayHarness, FRAME_TIMEOUT};

#[tokio::test]
async fn test_online_receiver_gets_stamped_message() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    let chat = direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;
    let mut b = harness.connect(2).await;

    a.send_json(json!({ "content": "hi", "receiver_id": "2" }));

    let received = b.next_frame().await;
    assert_eq!(received["type"], "message");
    assert_eq!(received["sender_id"], "1");
    assert_eq!(received["receiver_id"], "2");
    assert_eq!(received["content"], "hi");
    assert_eq!(received["chat_id"], chat.id.to_string());

    // Persisted before the receiver saw it.
    let stored = harness.store.list_by_chat(chat.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(received["id"], stored[0].id.to_string());

    let ack = a.next_frame().await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["id"], received["id"]);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_offline_receiver_still_persists() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    let chat = direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;
    a.send_json(json!({ "content": "are you there?", "receiver_id": 2 }));

    let ack = a.next_frame().await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(harness.store.list_by_chat(chat.id).await.unwrap().len(), 1);

    a.disconnect().await;
}

#[tokio::test]
async fn test_malformed_input_reports_and_continues() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;

    a.send_text("{not json");
    let error = a.next_frame().await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "malformed");

    a.send_json(json!({ "content": "   ", "receiver_id": "2" }));
    assert_eq!(a.next_frame().await["code"], "malformed");

    // Still serving the same connection.
    a.send_json(json!({ "content": "recovered", "receiver_id": "2" }));
    assert_eq!(a.next_frame().await["type"], "ack");
    assert_eq!(harness.store.message_count().await, 1);

    a.disconnect().await;
}

#[tokio::test]
async fn test_unknown_chat_and_non_member_are_rejected() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    seed_user(&harness.store, 3).await;
    let chat = direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;

    a.send_json(json!({ "content": "hello", "receiver_id": "3" }));
    assert_eq!(a.next_frame().await["code"], "chat_not_found");

    a.send_json(json!({ "content": "hello", "receiver_id": "3", "chat_id": chat.id.to_string() }));
    assert_eq!(a.next_frame().await["code"], "not_member");

    assert_eq!(harness.store.message_count().await, 0);
    a.disconnect().await;
}

#[tokio::test]
async fn test_client_supplied_sender_is_ignored() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;
    let mut b = harness.connect(2).await;

    a.send_json(json!({ "content": "spoof", "receiver_id": "2", "sender_id": "2" }));

    let received = b.next_frame().await;
    assert_eq!(received["sender_id"], "1");

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_binary_frame_is_rejected() {
    let harness = RelayHarness::new();
    let mut a = harness.connect(1).await;

    a.inbound
        .unbounded_send(Ok(axum::extract::ws::Message::Binary(vec![1u8, 2, 3].into())))
        .unwrap();

    assert_eq!(a.next_frame().await["code"], "malformed");
    a.disconnect().await;
}

#[tokio::test]
async fn test_new_connection_supersedes_old_one() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    direct_chat(&harness.store, &alice, &bob).await;

    let first = harness.connect(2).await;
    let mut second = harness.connect(2).await;

    // The superseded loop exits on its own.
    tokio::time::timeout(FRAME_TIMEOUT, first.task)
        .await
        .expect("superseded loop still running")
        .unwrap();
    assert!(harness.registry.is_online(2));

    let a = harness.connect(1).await;
    a.send_json(json!({ "content": "to the new socket", "receiver_id": "2" }));
    assert_eq!(second.next_frame().await["content"], "to the new socket");

    a.disconnect().await;
    second.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_releases_registration() {
    let harness = RelayHarness::new();
    let a = harness.connect(1).await;
    assert!(harness.registry.is_online(1));

    a.disconnect().await;

    assert!(!harness.registry.is_online(1));
}

#[tokio::test]
async fn test_transport_error_ends_loop() {
    let harness = RelayHarness::new();
    let a = harness.connect(1).await;

    a.inbound
        .unbounded_send(Err("connection reset".to_string()))
        .unwrap();

    tokio::time::timeout(FRAME_TIMEOUT, a.task)
        .await
        .expect("loop did not exit")
        .unwrap();
    assert!(!harness.registry.is_online(1));
}

#[tokio::test]
async fn test_close_all_ends_every_loop() {
    let harness = RelayHarness::new();
    let a = harness.connect(1).await;
    let b = harness.connect(2).await;

    assert_eq!(harness.registry.close_all(), 2);

    for task in [a.task, b.task] {
        tokio::time::timeout(FRAME_TIMEOUT, task)
            .await
            .expect("loop did not exit")
            .unwrap();
    }
    let registry = harness.registry.clone();
    wait_until(move || registry.online_count() == 0).await;
}

#[tokio::test]
async fn test_ack_arrives_without_other_traffic() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;
    let mut b = harness.connect(2).await;

    a.send_json(json!({ "content": "one", "receiver_id": "2" }));
    assert_eq!(a.next_frame().await["type"], "ack");
    assert_eq!(b.next_frame().await["content"], "one");

    // Nothing is echoed back to the receiver as an ack.
    assert!(b.is_silent(Duration::from_millis(100)).await);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_self_addressed_message_is_rejected() {
    let harness = RelayHarness::new();
    let alice = seed_user(&harness.store, 1).await;
    let bob = seed_user(&harness.store, 2).await;
    direct_chat(&harness.store, &alice, &bob).await;

    let mut a = harness.connect(1).await;
    let mut b = harness.connect(2).await;

    a.send_json(json!({ "content": "note to self", "receiver_id": "1" }));

    let error = a.next_frame().await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "malformed");
    assert!(b.is_silent(Duration::from_millis(100)).await);
    assert_eq!(harness.store.message_count().await, 0);

    a.disconnect().await;
    b.disconnect().await;
}

#[tokio::test]
async fn test_shutdown_waits_for_every_loop() {
    let harness = RelayHarness::new();
    let a = harness.connect(1).await;
    let b = harness.connect(2).await;
    assert_eq!(harness.registry.active_loops(), 2);

    assert!(harness.registry.shutdown(FRAME_TIMEOUT).await);

    assert_eq!(harness.registry.active_loops(), 0);
    assert_eq!(harness.registry.online_count(), 0);
    for task in [a.task, b.task] {
        tokio::time::timeout(FRAME_TIMEOUT, task)
            .await
            .expect("loop did not exit")
            .unwrap();
    }
}

#[tokio::test]
async fn test_connection_after_shutdown_ends_immediately() {
    let harness = RelayHarness::new();
    assert!(harness.registry.shutdown(FRAME_TIMEOUT).await);

    let (_inbound_tx, inbound_rx) =
        futures::channel::mpsc::unbounded::<Result<axum::extract::ws::Message, String>>();
    let (outbound_tx, _outbound_rx) =
        futures::channel::mpsc::unbounded::<axum::extract::ws::Message>();
    let task = tokio::spawn(chat_relay::presentation::websocket::run_connection(
        1,
        inbound_rx,
        outbound_tx,
        harness.ctx.clone(),
    ));

    tokio::time::timeout(FRAME_TIMEOUT, task)
        .await
        .expect("late connection kept running")
        .unwrap();
    assert!(!harness.registry.is_online(1));
}
