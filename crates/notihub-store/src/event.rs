//! Store change notifications for toast and badge consumers.

use notihub_core::types::{Notification, NotificationId, UserId};

/// Why a notification left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Explicit `remove` call.
    Removed,
    /// Low priority delay elapsed.
    AutoDismissed,
    /// Expired and purged from history.
    Expired,
    /// Dropped to respect the history cap.
    Trimmed,
}

/// What changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// History for a user was loaded from durable storage.
    Loaded {
        /// User whose history is now visible.
        user_id: UserId,
        /// Entries that survived the expiry filter.
        count: usize,
    },
    /// The current user was detached (logout).
    Detached,
    /// A notification was added.
    Added(Notification),
    /// One notification was marked read.
    Read(NotificationId),
    /// Every notification was marked read.
    AllRead,
    /// A notification was removed.
    Removed {
        /// Removed notification.
        id: NotificationId,
        /// Why it was removed.
        reason: RemovalReason,
    },
    /// Everything was cleared.
    Cleared,
}

/// Change event published after every store mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    /// The mutation.
    pub change: StoreChange,
    /// Unread count after the mutation.
    pub unread_count: usize,
}
