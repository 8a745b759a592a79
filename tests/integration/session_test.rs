//! Integration tests for auth-signal driven connect and disconnect.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use notihub_core::types::{AuthSignal, ConnectionStatus, NewNotification, UserId};
use notihub_realtime::ConnectionEvent;

use crate::helpers::{self, MockConnector, Outcome};

#[tokio::test]
async fn test_login_connects_and_logout_disconnects() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut events = client.manager().subscribe();

    let (auth, signal) = watch::channel(AuthSignal::signed_out());
    let bridge = client.bind_session(signal);

    auth.send_replace(AuthSignal::signed_in("alice"));
    let seen = helpers::events_until(&mut events, ConnectionStatus::Connected).await;
    assert_eq!(
        helpers::statuses(&seen),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
    );
    assert_eq!(client.store().current_user(), Some(UserId::from("alice")));

    auth.send_replace(AuthSignal::signed_out());
    let seen = helpers::events_until(&mut events, ConnectionStatus::Disconnected).await;
    assert_eq!(helpers::statuses(&seen), vec![ConnectionStatus::Disconnected]);
    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1"]);

    bridge.shutdown().await;
    assert_eq!(client.store().current_user(), None);
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_pending_reconnect() {
    let hub = MockConnector::scripted(vec![Outcome::Accept], Outcome::Fail);
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    let mut events = client.manager().subscribe();
    let (auth, signal) = watch::channel(AuthSignal::signed_in("alice"));
    let bridge = client.bind_session(signal);
    helpers::events_until(&mut events, ConnectionStatus::Connected).await;

    hub.drop_connection();
    loop {
        if let ConnectionEvent::StateChanged { current, .. } = helpers::next_event(&mut events).await {
            if current.attempt == Some(2) {
                break;
            }
        }
    }

    auth.send_replace(AuthSignal::signed_out());
    helpers::events_until(&mut events, ConnectionStatus::Disconnected).await;
    let attempts = hub.attempts();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(hub.attempts(), attempts);
    assert_eq!(client.manager().state().status, ConnectionStatus::Disconnected);

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_switching_users_reconnects_with_their_history() {
    let storage = helpers::storage_with_token("tok");
    let hub = MockConnector::new();

    // Seed history for both users through the store itself.
    {
        let seed = helpers::client(MockConnector::new(), Arc::clone(&storage));
        seed.store().load_for_user(&UserId::from("alice"));
        seed.store().add(NewNotification::new("For Alice", "a"));
        seed.store().load_for_user(&UserId::from("bob"));
        seed.store().add(NewNotification::new("For Bob", "b1"));
        seed.store().add(NewNotification::new("For Bob", "b2"));
        seed.store().detach();
    }

    let client = helpers::client(Arc::clone(&hub), storage);
    let (auth, signal) = watch::channel(AuthSignal::signed_in("alice"));
    let bridge = client.bind_session(signal);
    helpers::wait_for_state(client.manager(), |s| s.connection_id.as_deref() == Some("conn-1")).await;
    assert_eq!(client.store().list().len(), 1);

    auth.send_replace(AuthSignal::signed_in("bob"));
    helpers::wait_for_state(client.manager(), |s| s.connection_id.as_deref() == Some("conn-2")).await;

    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1", "connect:2"]);
    assert_eq!(client.store().current_user(), Some(UserId::from("bob")));
    let messages: Vec<String> = client.store().list().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["b2", "b1"]);

    bridge.shutdown().await;
    assert_eq!(client.manager().state().status, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_pushed_notifications_persist_for_the_signed_in_user() {
    let storage = helpers::storage_with_token("tok");
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), Arc::clone(&storage));
    let mut changes = client.store().subscribe();
    let (_auth, signal) = watch::channel(AuthSignal::signed_in("carol"));
    let bridge = client.bind_session(signal);
    helpers::wait_for_state(client.manager(), |s| s.is_connected()).await;

    hub.invoke("ReceiveNotification", vec![json!({"message": "Booth 12 is live"})]);
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event.change, notihub_store::StoreChange::Added(_)) {
            break;
        }
    }
    bridge.shutdown().await;

    // A fresh client for the same user sees the persisted history.
    let reloaded = helpers::client(MockConnector::new(), storage);
    reloaded.store().load_for_user(&UserId::from("carol"));
    let messages: Vec<String> = reloaded.store().list().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Booth 12 is live"]);
}

#[tokio::test]
async fn test_login_without_stored_token_reports_error() {
    let storage: Arc<dyn notihub_core::traits::DurableStorage> =
        Arc::new(notihub_store::backend::MemoryStorage::new());
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), storage);
    let (_auth, signal) = watch::channel(AuthSignal::signed_in("dave"));
    let bridge = client.bind_session(signal);

    let state = helpers::wait_for_state(client.manager(), |s| s.status == ConnectionStatus::Error).await;
    assert!(state.last_error.unwrap().contains("No access token"));
    assert_eq!(hub.attempts(), 0);

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_unregister_device_without_push_is_noop() {
    let hub = MockConnector::new();
    let client = helpers::client(Arc::clone(&hub), helpers::storage_with_token("tok"));
    assert!(!client.unregister_device().await.unwrap());
    assert_eq!(hub.attempts(), 0);
}
