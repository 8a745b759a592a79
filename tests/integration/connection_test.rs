//! Integration tests for the connection lifecycle and reconnection.

use std::sync::Arc;
use std::time::Duration;

use notihub_core::error::ErrorKind;
use notihub_core::traits::DurableStorage;
use notihub_core::types::ConnectionStatus;
use notihub_realtime::session::StoredTokenProvider;
use notihub_realtime::{ConnectionEvent, HubMessage, ReconnectPolicy};

use crate::helpers::{self, MockConnector, Outcome, RotatingTokens};

#[tokio::test]
async fn test_start_reports_connecting_then_connected() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    let mut events = manager.subscribe();

    manager.start(helpers::token("tok")).await.unwrap();

    let seen = helpers::events_until(&mut events, ConnectionStatus::Connected).await;
    assert_eq!(
        helpers::statuses(&seen),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
    );
    let state = manager.state();
    assert!(manager.is_connected());
    assert_eq!(state.connection_id.as_deref(), Some("conn-1"));
    assert_eq!(hub.tokens(), vec!["tok".to_string()]);
}

#[tokio::test]
async fn test_start_without_token_fails_before_handshake() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));

    let err = manager
        .start(Arc::new(notihub_realtime::StaticTokenProvider::empty()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Authentication);
    assert_eq!(hub.attempts(), 0);
    assert_eq!(manager.state().status, ConnectionStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_failure_moves_to_error_without_retry() {
    let hub = MockConnector::scripted(vec![Outcome::Fail], Outcome::Accept);
    let manager = helpers::manager(Arc::clone(&hub));

    let err = manager.start(helpers::token("tok")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);

    let state = manager.state();
    assert_eq!(state.status, ConnectionStatus::Error);
    assert!(state.last_error.unwrap().contains("Handshake rejected"));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(hub.attempts(), 1);
}

#[tokio::test]
async fn test_double_start_tears_down_before_new_handshake() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));

    manager.start(helpers::token("tok")).await.unwrap();
    manager.start(helpers::token("tok")).await.unwrap();

    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1", "connect:2"]);
    assert_eq!(manager.state().connection_id.as_deref(), Some("conn-2"));
}

#[tokio::test]
async fn test_restart_passes_through_disconnected() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(helpers::token("tok")).await.unwrap();
    let mut events = manager.subscribe();

    manager.start(helpers::token("tok")).await.unwrap();

    let seen = helpers::events_until(&mut events, ConnectionStatus::Connected).await;
    let pairs: Vec<(ConnectionStatus, ConnectionStatus)> = seen
        .iter()
        .filter_map(|event| match event {
            ConnectionEvent::StateChanged { previous, current } => Some((*previous, current.status)),
            ConnectionEvent::Reconnected { .. } => None,
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            (ConnectionStatus::Connected, ConnectionStatus::Disconnected),
            (ConnectionStatus::Disconnected, ConnectionStatus::Connecting),
            (ConnectionStatus::Connecting, ConnectionStatus::Connected),
        ]
    );
}

#[tokio::test]
async fn test_stop_resets_to_disconnected_and_is_idempotent() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    let mut events = manager.subscribe();

    manager.stop().await;
    manager.start(helpers::token("tok")).await.unwrap();
    manager.stop().await;
    manager.stop().await;

    let seen = helpers::events_until(&mut events, ConnectionStatus::Disconnected).await;
    assert_eq!(
        helpers::statuses(&seen),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected
        ]
    );
    assert!(events.try_recv().is_err());
    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1"]);
}

#[tokio::test]
async fn test_stop_cancels_in_flight_start() {
    let hub = MockConnector::scripted(vec![Outcome::Hang], Outcome::Accept);
    let manager = helpers::manager(Arc::clone(&hub));

    let pending = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.start(helpers::token("tok")).await }
    });
    while hub.attempts() == 0 {
        tokio::task::yield_now().await;
    }

    manager.stop().await;

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert_eq!(manager.state().status, ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_drop_then_reconnect_emits_one_reconnected() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(helpers::token("tok")).await.unwrap();
    let mut events = manager.subscribe();

    hub.drop_connection();

    let mut seen = helpers::events_until(&mut events, ConnectionStatus::Connected).await;
    // Reconnected follows the transition back to connected.
    seen.push(helpers::next_event(&mut events).await);

    assert_eq!(
        helpers::statuses(&seen),
        vec![ConnectionStatus::Reconnecting, ConnectionStatus::Connected]
    );
    let reconnected: Vec<_> = seen
        .iter()
        .filter(|e| matches!(e, ConnectionEvent::Reconnected { .. }))
        .collect();
    assert_eq!(
        reconnected,
        vec![&ConnectionEvent::Reconnected {
            connection_id: "conn-2".to_string()
        }]
    );
    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1", "connect:2"]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_backoff() {
    let hub = MockConnector::scripted(vec![Outcome::Accept], Outcome::Fail);
    let manager = helpers::manager(Arc::clone(&hub));
    let mut events = manager.subscribe();
    manager.start(helpers::token("tok")).await.unwrap();

    hub.drop_connection();

    // Attempt 1 is immediate and fails; attempt 2 waits two seconds.
    loop {
        if let ConnectionEvent::StateChanged { current, .. } = helpers::next_event(&mut events).await {
            if current.attempt == Some(2) {
                break;
            }
        }
    }
    assert_eq!(hub.attempts(), 2);

    manager.stop().await;
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(hub.attempts(), 2);
    assert_eq!(manager.state().status, ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_follows_schedule_until_exhausted() {
    let hub = MockConnector::scripted(vec![Outcome::Accept], Outcome::Fail);
    let policy = ReconnectPolicy::new(vec![Duration::ZERO, Duration::from_secs(2)], 3);
    let manager = helpers::manager_with_policy(Arc::clone(&hub), policy);
    manager.start(helpers::token("tok")).await.unwrap();

    let started = tokio::time::Instant::now();
    hub.drop_connection();
    let state = helpers::wait_for_state(&manager, |s| s.status == ConnectionStatus::Error).await;

    // 0s, then 2s, then the final delay repeated.
    assert_eq!(started.elapsed(), Duration::from_secs(4));
    assert_eq!(hub.attempts(), 4);
    assert!(state.last_error.unwrap().contains("after 3 attempts"));
}

#[tokio::test(start_paused = true)]
async fn test_each_reconnect_fetches_a_fresh_token() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(Arc::new(RotatingTokens::default())).await.unwrap();

    hub.drop_connection();
    helpers::wait_for_state(&manager, |s| s.connection_id.as_deref() == Some("conn-2")).await;

    assert_eq!(hub.tokens(), vec!["t1".to_string(), "t2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_token_during_reconnect_is_fatal() {
    let storage = helpers::storage_with_token("tok");
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager
        .start(Arc::new(StoredTokenProvider::new(Arc::clone(&storage), "auth_token")))
        .await
        .unwrap();

    storage.remove("auth_token").unwrap();
    hub.drop_connection();

    let state = helpers::wait_for_state(&manager, |s| s.status == ConnectionStatus::Error).await;
    assert!(state.last_error.unwrap().contains("No access token"));
    assert_eq!(hub.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_token_during_reconnect_is_fatal() {
    let hub = MockConnector::scripted(vec![Outcome::Accept], Outcome::Unauthorized);
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(helpers::token("tok")).await.unwrap();

    hub.drop_connection();
    helpers::wait_for_state(&manager, |s| s.status == ConnectionStatus::Error).await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(hub.attempts(), 2);
}

#[tokio::test]
async fn test_hub_close_without_reconnect_is_fatal() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(helpers::token("tok")).await.unwrap();

    hub.send(HubMessage::Close {
        error: Some("Server is shutting down".to_string()),
        allow_reconnect: false,
    });

    let state = helpers::wait_for_state(&manager, |s| s.status == ConnectionStatus::Error).await;
    assert_eq!(state.last_error.as_deref(), Some("Server is shutting down"));
    assert_eq!(hub.log(), vec!["connect:1", "close:conn-1"]);

    // An explicit start recovers.
    manager.start(helpers::token("tok")).await.unwrap();
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_hub_close_with_reconnect_retries() {
    let hub = MockConnector::new();
    let manager = helpers::manager(Arc::clone(&hub));
    manager.start(helpers::token("tok")).await.unwrap();

    hub.send(HubMessage::Close {
        error: None,
        allow_reconnect: true,
    });

    helpers::wait_for_state(&manager, |s| s.connection_id.as_deref() == Some("conn-2")).await;
    assert_eq!(manager.metrics().snapshot().reconnect_attempts, 1);
}
