//! Integration tests for the local notification store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use notihub_core::config::NotificationConfig;
use notihub_core::traits::DurableStorage;
use notihub_core::types::{NewNotification, NotificationId, NotificationPriority, UserId};
use notihub_store::backend::MemoryStorage;
use notihub_store::keys::notifications_key;
use notihub_store::NotificationStore;

fn store_for(storage: &Arc<dyn DurableStorage>, user: &str) -> NotificationStore {
    let store = NotificationStore::new(Arc::clone(storage), NotificationConfig::default());
    store.load_for_user(&UserId::from(user));
    store
}

fn memory() -> Arc<dyn DurableStorage> {
    Arc::new(MemoryStorage::new())
}

fn unread_in_list(store: &NotificationStore) -> usize {
    store.list().iter().filter(|n| !n.read).count()
}

#[tokio::test]
async fn test_unread_count_tracks_every_mutation() {
    let storage = memory();
    let store = store_for(&storage, "alice");

    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(store.add(NewNotification::new("t", format!("m{i}"))).id);
        assert_eq!(store.unread_count(), unread_in_list(&store));
    }

    let check = |store: &NotificationStore| {
        assert_eq!(store.unread_count(), unread_in_list(store));
    };
    store.mark_read(&ids[0]);
    check(&store);
    store.mark_read(&ids[0]);
    check(&store);
    store.remove(&ids[1]);
    check(&store);
    store.remove(&ids[0]);
    check(&store);
    store.mark_read(&NotificationId::new());
    check(&store);
    store.add(NewNotification::new("late", "x"));
    check(&store);
    store.mark_all_read();
    check(&store);
    store.remove(&ids[5]);
    check(&store);
    assert_eq!(store.unread_count(), 0);
}

#[tokio::test]
async fn test_clear_all_empties_list_and_durable_storage() {
    let storage = memory();
    let store = store_for(&storage, "alice");
    store.add(NewNotification::new("a", "1"));
    store.add(NewNotification::new("b", "2"));
    assert!(storage.get(&notifications_key(&UserId::from("alice"))).unwrap().is_some());

    store.clear_all();

    assert!(store.list().is_empty());
    assert_eq!(store.unread_count(), 0);
    assert!(storage.get(&notifications_key(&UserId::from("alice"))).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_only_low_priority_auto_dismisses() {
    let storage = memory();
    let store = store_for(&storage, "alice");
    let low = store.add(NewNotification::new("fyi", "low").priority(NotificationPriority::Low));
    store.add(NewNotification::new("heads up", "medium"));
    store.add(NewNotification::new("urgent", "high").priority(NotificationPriority::High));

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(store.get(&low.id).is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(store.get(&low.id).is_none());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    let remaining: Vec<String> = store.list().into_iter().map(|n| n.message).collect();
    assert_eq!(remaining, vec!["high", "medium"]);
}

#[tokio::test]
async fn test_history_survives_restart_without_expired_entries() {
    let storage = memory();
    {
        let store = store_for(&storage, "alice");
        store.add(NewNotification::new("keep", "fresh"));
        store.add(
            NewNotification::new("stale", "expires soon")
                .expires_at(Utc::now() + chrono::Duration::milliseconds(50)),
        );
        store.mark_all_read();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reopened = store_for(&storage, "alice");
    let messages: Vec<String> = reopened.list().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["fresh"]);
    assert!(reopened.list()[0].read);

    // Other users never see it.
    let other = store_for(&storage, "bob");
    assert!(other.list().is_empty());
}
