//! Connection registry behaviour under concurrent use

use std::sync::Arc;

use chat_relay::presentation::websocket::{
    ConnectionHandle, ConnectionRegistry, DeliveryOutcome, ServerFrame,
};

fn ping() -> ServerFrame {
    ServerFrame::error("test", "ping")
}

#[tokio::test]
async fn test_latest_registration_receives_deliveries() {
    let registry = ConnectionRegistry::new();
    let (first, mut first_rx) = ConnectionHandle::new(7, 8);
    let (second, mut second_rx) = ConnectionHandle::new(7, 8);

    registry.register(first.clone());
    registry.register(second.clone());

    assert_eq!(registry.deliver(7, ping()), DeliveryOutcome::Delivered);
    assert_eq!(second_rx.recv().await, Some(ping()));
    assert!(first_rx.try_recv().is_err());

    // Teardown of the superseded connection leaves the new one in place.
    assert!(!registry.release(&first));
    assert_eq!(registry.connection_id(7), Some(second.connection_id()));
}

#[tokio::test]
async fn test_offline_delivery_is_reported() {
    let registry = ConnectionRegistry::new();

    assert_eq!(registry.deliver(99, ping()), DeliveryOutcome::Offline);
    assert!(!registry.unregister(99));
}

#[tokio::test]
async fn test_full_queue_drops_instead_of_blocking() {
    let registry = ConnectionRegistry::new();
    let (handle, _rx) = ConnectionHandle::new(3, 1);
    registry.register(handle);

    assert_eq!(registry.deliver(3, ping()), DeliveryOutcome::Delivered);
    assert_eq!(registry.deliver(3, ping()), DeliveryOutcome::QueueFull);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_and_delivery() {
    let registry = Arc::new(ConnectionRegistry::new());
    let mut tasks = Vec::new();

    for user_id in 0..64i64 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let (handle, mut rx) = ConnectionHandle::new(user_id, 4);
            registry.register(handle.clone());
            let outcome = registry.deliver(user_id, ServerFrame::error("test", "hello"));
            let received = rx.recv().await;
            registry.release(&handle);
            (outcome, received.is_some())
        }));
    }

    for task in tasks {
        let (outcome, received) = task.await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert!(received);
    }
    assert_eq!(registry.online_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_registrations_keep_one_handle() {
    let registry = Arc::new(ConnectionRegistry::new());
    let mut tasks = Vec::new();

    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let (handle, rx) = ConnectionHandle::new(5, 4);
            registry.register(handle.clone());
            (handle, rx)
        }));
    }
    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap());
    }

    assert_eq!(registry.online_count(), 1);
    let current = registry.connection_id(5).unwrap();
    assert_eq!(
        handles
            .iter()
            .filter(|(h, _)| h.connection_id() == current)
            .count(),
        1
    );
}
