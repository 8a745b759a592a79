//! # notihub-store
//!
//! Process-local source of truth for notification history and unread
//! counts. Survives reconnects and restarts by mirroring every mutation to
//! durable per-user storage.
//!
//! - [`NotificationStore`]: ordered newest-first log with read state,
//!   expiry filtering and low priority auto-dismiss
//! - [`backend`]: in-memory and file-backed [`DurableStorage`] implementations
//!
//! [`DurableStorage`]: notihub_core::traits::DurableStorage

pub mod backend;
pub mod event;
pub mod keys;
pub mod store;

pub use backend::open_storage;
pub use event::{RemovalReason, StoreChange, StoreEvent};
pub use store::NotificationStore;
