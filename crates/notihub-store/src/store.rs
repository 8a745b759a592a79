//! Local notification store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use notihub_core::config::NotificationConfig;
use notihub_core::traits::DurableStorage;
use notihub_core::types::{NewNotification, Notification, NotificationId, UserId};

use crate::event::{RemovalReason, StoreChange, StoreEvent};
use crate::keys::notifications_key;

/// Authoritative, process-local notification history for the current user.
///
/// All operations are synchronous and total: unknown ids are no-ops and
/// storage failures are logged rather than returned. Cloning is cheap and
/// every clone shares the same state.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    storage: Arc<dyn DurableStorage>,
    config: NotificationConfig,
    state: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// User whose history is loaded; `None` keeps mutations in memory only.
    user: Option<UserId>,
    /// Newest first.
    items: Vec<Notification>,
    /// Pending auto-dismiss timers.
    timers: HashMap<NotificationId, JoinHandle<()>>,
}

impl StoreState {
    fn unread_count(&self) -> usize {
        let now = Utc::now();
        self.items
            .iter()
            .filter(|n| !n.read && !n.is_expired_at(now))
            .count()
    }

    fn cancel_timer(&mut self, id: &NotificationId) {
        if let Some(handle) = self.timers.remove(id) {
            handle.abort();
        }
    }

    fn cancel_all_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl NotificationStore {
    /// Create an empty store with no user attached.
    pub fn new(storage: Arc<dyn DurableStorage>, config: NotificationConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        Self {
            shared: Arc::new(Shared {
                storage,
                config,
                state: Mutex::new(StoreState::default()),
                events,
            }),
        }
    }

    /// Subscribe to change events.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    /// The user whose history is loaded.
    pub fn current_user(&self) -> Option<UserId> {
        self.lock().user.clone()
    }

    /// Load a user's persisted history and make it the visible list.
    ///
    /// Expired entries and low priority entries whose dismiss delay already
    /// elapsed are dropped before becoming visible. Notifications added while
    /// no user was attached are merged in by creation time and persisted for
    /// this user.
    pub fn load_for_user(&self, user_id: &UserId) -> usize {
        let key = notifications_key(user_id);
        let stored: Vec<Notification> = match self.shared.storage.get_json(&key) {
            Ok(Some(items)) => items,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load notification history");
                Vec::new()
            }
        };

        let now = Utc::now();
        let dismiss_after = self.dismiss_delay();
        let total = stored.len();
        let mut pending = Vec::new();
        let loaded: Vec<Notification> = stored
            .into_iter()
            .filter(|n| !n.is_expired_at(now))
            .filter(|n| {
                if !n.priority.auto_dismisses() {
                    return true;
                }
                let age = (now - n.created_at).to_std().unwrap_or(Duration::ZERO);
                match dismiss_after.checked_sub(age) {
                    Some(remaining) if !remaining.is_zero() => {
                        pending.push((n.id, remaining));
                        true
                    }
                    _ => false,
                }
            })
            .collect();
        let dropped = total - loaded.len();

        let (count, carried, unread_count) = {
            let mut state = self.lock();
            // Unattached items keep their dismiss timers; another user's do not.
            let carried = if state.user.is_none() {
                std::mem::take(&mut state.items)
            } else {
                state.cancel_all_timers();
                Vec::new()
            };
            let carried_count = carried.len();

            let mut items = carried;
            items.extend(loaded);
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            state.user = Some(user_id.clone());
            state.items = items;
            self.trim(&mut state);
            for (id, remaining) in pending {
                if state.items.iter().any(|n| n.id == id) {
                    self.schedule_dismiss(&mut state, id, remaining);
                }
            }
            if dropped > 0 || carried_count > 0 {
                self.persist(&state);
            }
            (state.items.len(), carried_count, state.unread_count())
        };

        info!(
            user_id = %user_id,
            loaded = count,
            dropped,
            carried,
            "Notification history loaded"
        );
        self.emit(
            StoreChange::Loaded {
                user_id: user_id.clone(),
                count,
            },
            unread_count,
        );
        count
    }

    /// Forget the current user without purging their durable history.
    pub fn detach(&self) {
        {
            let mut state = self.lock();
            if state.user.is_none() && state.items.is_empty() {
                return;
            }
            state.cancel_all_timers();
            state.user = None;
            state.items.clear();
        }
        debug!("Notification store detached");
        self.emit(StoreChange::Detached, 0);
    }

    /// Add a notification with a fresh id and creation time, newest first.
    ///
    /// Low priority notifications are removed automatically once the
    /// configured delay has passed.
    pub fn add(&self, new: NewNotification) -> Notification {
        let notification = new.into_notification(Utc::now());

        let unread_count = {
            let mut state = self.lock();
            state.items.insert(0, notification.clone());
            self.trim(&mut state);
            if notification.priority.auto_dismisses() {
                self.schedule_dismiss(&mut state, notification.id, self.dismiss_delay());
            }
            self.persist(&state);
            state.unread_count()
        };

        debug!(
            id = %notification.id,
            category = notification.category.as_str(),
            priority = notification.priority.as_str(),
            "Notification added"
        );
        self.emit(StoreChange::Added(notification.clone()), unread_count);
        notification
    }

    /// Mark one notification as read. Unknown ids are ignored.
    pub fn mark_read(&self, id: &NotificationId) {
        let unread_count = {
            let mut state = self.lock();
            let Some(entry) = state.items.iter_mut().find(|n| n.id == *id) else {
                return;
            };
            if entry.read {
                return;
            }
            entry.read = true;
            self.persist(&state);
            state.unread_count()
        };
        self.emit(StoreChange::Read(*id), unread_count);
    }

    /// Mark every notification as read.
    pub fn mark_all_read(&self) {
        let unread_count = {
            let mut state = self.lock();
            if state.items.iter().all(|n| n.read) {
                return;
            }
            for entry in state.items.iter_mut() {
                entry.read = true;
            }
            self.persist(&state);
            state.unread_count()
        };
        self.emit(StoreChange::AllRead, unread_count);
    }

    /// Remove one notification. Unknown ids are ignored.
    pub fn remove(&self, id: &NotificationId) {
        self.remove_with_reason(id, RemovalReason::Removed);
    }

    /// Remove everything and purge the user's durable history.
    pub fn clear_all(&self) {
        let user = {
            let mut state = self.lock();
            state.cancel_all_timers();
            state.items.clear();
            state.user.clone()
        };

        if let Some(user) = &user {
            if let Err(e) = self.shared.storage.remove(&notifications_key(user)) {
                warn!(user_id = %user, error = %e, "Failed to purge notification history");
            }
        }

        info!("Notifications cleared");
        self.emit(StoreChange::Cleared, 0);
    }

    /// Drop expired entries from history.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let (purged, unread_count) = {
            let mut state = self.lock();
            let expired: Vec<NotificationId> = state
                .items
                .iter()
                .filter(|n| n.is_expired_at(now))
                .map(|n| n.id)
                .collect();
            if expired.is_empty() {
                return 0;
            }
            for id in &expired {
                state.cancel_timer(id);
            }
            state.items.retain(|n| !n.is_expired_at(now));
            self.persist(&state);
            (expired, state.unread_count())
        };

        let count = purged.len();
        for id in purged {
            self.emit(
                StoreChange::Removed {
                    id,
                    reason: RemovalReason::Expired,
                },
                unread_count,
            );
        }
        count
    }

    /// Snapshot of non-expired notifications, newest first.
    pub fn list(&self) -> Vec<Notification> {
        let now = Utc::now();
        self.lock()
            .items
            .iter()
            .filter(|n| !n.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Snapshot of everything held, including expired entries.
    pub fn history(&self) -> Vec<Notification> {
        self.lock().items.clone()
    }

    /// Look up one non-expired notification.
    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        let now = Utc::now();
        self.lock()
            .items
            .iter()
            .find(|n| n.id == *id && !n.is_expired_at(now))
            .cloned()
    }

    /// Unread notifications among non-expired entries.
    pub fn unread_count(&self) -> usize {
        self.lock().unread_count()
    }

    fn remove_with_reason(&self, id: &NotificationId, reason: RemovalReason) {
        let unread_count = {
            let mut state = self.lock();
            let before = state.items.len();
            state.items.retain(|n| n.id != *id);
            if state.items.len() == before {
                return;
            }
            if reason == RemovalReason::AutoDismissed {
                // The timer task is the caller; just forget its handle.
                state.timers.remove(id);
            } else {
                state.cancel_timer(id);
            }
            self.persist(&state);
            state.unread_count()
        };
        debug!(id = %id, reason = ?reason, "Notification removed");
        self.emit(StoreChange::Removed { id: *id, reason }, unread_count);
    }

    fn trim(&self, state: &mut StoreState) {
        let max = self.shared.config.max_stored;
        if max == 0 || state.items.len() <= max {
            return;
        }
        let dropped: Vec<Notification> = state.items.drain(max..).collect();
        for n in &dropped {
            state.cancel_timer(&n.id);
        }
        debug!(count = dropped.len(), max, "Trimmed notification history");
    }

    fn schedule_dismiss(&self, state: &mut StoreState, id: NotificationId, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(id = %id, "No async runtime; low priority notification will not auto-dismiss");
            return;
        };
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                NotificationStore { shared }.remove_with_reason(&id, RemovalReason::AutoDismissed);
            }
        });
        state.cancel_timer(&id);
        state.timers.insert(id, handle);
    }

    fn persist(&self, state: &StoreState) {
        let Some(user) = &state.user else {
            return;
        };
        if let Err(e) = self
            .shared
            .storage
            .set_json(&notifications_key(user), &state.items)
        {
            warn!(user_id = %user, error = %e, "Failed to persist notifications");
        }
    }

    fn emit(&self, change: StoreChange, unread_count: usize) {
        // No subscribers is fine.
        let _ = self.shared.events.send(StoreEvent {
            change,
            unread_count,
        });
    }

    fn dismiss_delay(&self) -> Duration {
        Duration::from_secs(self.shared.config.auto_dismiss_seconds)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
