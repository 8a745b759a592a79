//! Handlers that consume decoded push events.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use notihub_store::NotificationStore;

use super::payload::PushEvent;

/// Receives push events in arrival order on the dispatcher worker.
///
/// Handlers run synchronously on the worker and should not block.
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event.
    fn handle(&self, event: &PushEvent);
}

impl<F> EventHandler for F
where
    F: Fn(&PushEvent) + Send + Sync + 'static,
{
    fn handle(&self, event: &PushEvent) {
        self(event)
    }
}

/// Routes normalized notifications into the local store.
#[derive(Debug, Clone)]
pub struct StoreHandler {
    store: NotificationStore,
}

impl StoreHandler {
    /// Create a handler writing into `store`.
    pub fn new(store: NotificationStore) -> Self {
        Self { store }
    }
}

impl EventHandler for StoreHandler {
    fn handle(&self, event: &PushEvent) {
        let notification = self.store.add(event.notification.clone());
        debug!(
            event = %event.name,
            notification_id = %notification.id,
            priority = notification.priority.as_str(),
            "Stored push notification"
        );
    }
}

/// Runs several handlers for the same event, in order.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl Chain {
    /// Empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn then(mut self, handler: impl EventHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }
}

impl EventHandler for Chain {
    fn handle(&self, event: &PushEvent) {
        for handler in &self.handlers {
            handler.handle(event);
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
