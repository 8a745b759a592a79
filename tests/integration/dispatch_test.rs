//! Integration tests for push event dispatch into the store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use notihub_core::types::{Notification, NotificationCategory, NotificationPriority};
use notihub_realtime::PushEvent;
use notihub_store::{StoreChange, StoreEvent};

use crate::helpers::{self, MockConnector};

async fn next_added(rx: &mut broadcast::Receiver<StoreEvent>) -> Notification {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no store event")
            .expect("store channel closed");
        if let StoreChange::Added(notification) = event.change {
            return notification;
        }
    }
}

#[tokio::test]
async fn test_string_and_object_payloads_become_notifications() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut changes = client.store().subscribe();
    client.manager().start(Arc::clone(client.tokens())).await.unwrap();

    hub.invoke("ReceiveNotification", vec![json!("Your export is ready")]);
    hub.invoke(
        "ReceiveMessage",
        vec![json!({
            "message": "hi",
            "senderName": "Bob",
            "timestamp": "2024-01-01T00:00:00Z"
        })],
    );

    let plain = next_added(&mut changes).await;
    assert_eq!(plain.message, "Your export is ready");
    assert_eq!(plain.category, NotificationCategory::Info);
    assert_eq!(plain.priority, NotificationPriority::Medium);

    let message = next_added(&mut changes).await;
    assert_eq!(message.message, "hi");
    assert_eq!(message.sender.as_deref(), Some("Bob"));
    assert_eq!(
        message.sent_at.map(|at| at.to_rfc3339()),
        Some("2024-01-01T00:00:00+00:00".to_string())
    );

    // Newest first.
    let listed: Vec<String> = client.store().list().into_iter().map(|n| n.message).collect();
    assert_eq!(listed, vec!["hi", "Your export is ready"]);
    assert_eq!(client.store().unread_count(), 2);
}

#[tokio::test]
async fn test_sender_and_text_arguments() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut changes = client.store().subscribe();
    client.manager().start(Arc::clone(client.tokens())).await.unwrap();

    hub.invoke("ReceiveMessage", vec![json!("Alice"), json!("Lunch at noon?")]);

    let added = next_added(&mut changes).await;
    assert_eq!(added.sender.as_deref(), Some("Alice"));
    assert_eq!(added.message, "Lunch at noon?");
}

#[tokio::test]
async fn test_malformed_payload_is_stringified_not_dropped() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut changes = client.store().subscribe();
    client.manager().start(Arc::clone(client.tokens())).await.unwrap();

    hub.invoke("ReceiveNotification", vec![json!({"unexpected": [1, 2]})]);

    let added = next_added(&mut changes).await;
    assert_eq!(added.message, r#"{"unexpected":[1,2]}"#);
}

#[tokio::test]
async fn test_custom_handler_sees_events_in_order() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.dispatcher().register_fn("MeetingUpdated", move |event: &PushEvent| {
        let _ = tx.send(event.notification.message.clone());
    });
    client.manager().start(Arc::clone(client.tokens())).await.unwrap();

    for i in 0..10 {
        hub.invoke("MeetingUpdated", vec![json!(format!("update {i}"))]);
    }
    for i in 0..10 {
        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, format!("update {i}"));
    }
    // Not routed to the store.
    assert!(client.store().list().is_empty());
}

#[tokio::test]
async fn test_unhandled_events_are_counted() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut changes = client.store().subscribe();
    client.manager().start(Arc::clone(client.tokens())).await.unwrap();

    hub.invoke("Nobody", vec![json!("ignored")]);
    hub.invoke("ReceiveNotification", vec![json!("kept")]);
    next_added(&mut changes).await;

    let metrics = client.metrics().snapshot();
    assert_eq!(metrics.events_unhandled, 1);
    assert_eq!(metrics.events_dispatched, 1);
    assert_eq!(metrics.frames_received, 2);
}
