//! Ordered, non-blocking event dispatcher.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::metrics::RelayMetrics;

use super::handler::EventHandler;
use super::payload::PushEvent;

type HandlerMap = DashMap<String, Arc<dyn EventHandler>>;

/// Raw event waiting for the worker.
struct QueuedEvent {
    name: String,
    payload: Value,
    received_at: DateTime<Utc>,
}

/// Translates named push events into notifications and hands them to
/// registered handlers.
///
/// [`dispatch`](Self::dispatch) only enqueues, so the transport's read loop
/// never waits on handler work. A single worker drains the queue, which
/// keeps handler invocation in arrival order. Event names match
/// case-insensitively.
pub struct EventDispatcher {
    handlers: Arc<HandlerMap>,
    queue: mpsc::UnboundedSender<QueuedEvent>,
    metrics: Arc<RelayMetrics>,
}

impl EventDispatcher {
    /// Create the dispatcher and start its worker on the current runtime.
    ///
    /// The worker exits once the dispatcher is dropped and the queue drains.
    pub fn spawn(metrics: Arc<RelayMetrics>) -> Arc<Self> {
        let handlers: Arc<HandlerMap> = Arc::new(DashMap::new());
        let (queue, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(rx, Arc::clone(&handlers), Arc::clone(&metrics)));

        Arc::new(Self {
            handlers,
            queue,
            metrics,
        })
    }

    /// Associate `handler` with `event_name`, replacing any previous handler.
    ///
    /// Returns whether a handler was replaced.
    pub fn register_handler(&self, event_name: &str, handler: Arc<dyn EventHandler>) -> bool {
        let replaced = self.handlers.insert(key(event_name), handler).is_some();
        debug!(event = %event_name, replaced, "Registered push handler");
        replaced
    }

    /// Register a closure as the handler for `event_name`.
    pub fn register_fn<F>(&self, event_name: &str, handler: F) -> bool
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        self.register_handler(event_name, Arc::new(handler))
    }

    /// Remove the handler for `event_name`. Returns whether one existed.
    pub fn unregister_handler(&self, event_name: &str) -> bool {
        self.handlers.remove(&key(event_name)).is_some()
    }

    /// Whether a handler is registered for `event_name`.
    pub fn has_handler(&self, event_name: &str) -> bool {
        self.handlers.contains_key(&key(event_name))
    }

    /// Counters shared with the connection manager.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Enqueue an event. Never blocks and never fails; if the worker is gone
    /// the event is logged and counted as unhandled.
    pub fn dispatch(&self, event_name: &str, payload: Value) {
        let queued = QueuedEvent {
            name: event_name.to_string(),
            payload,
            received_at: Utc::now(),
        };
        if let Err(mpsc::error::SendError(lost)) = self.queue.send(queued) {
            warn!(event = %lost.name, "Dispatcher worker stopped; event not delivered");
            self.metrics.record_unhandled();
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .field("closed", &self.queue.is_closed())
            .finish()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedEvent>,
    handlers: Arc<HandlerMap>,
    metrics: Arc<RelayMetrics>,
) {
    while let Some(queued) = rx.recv().await {
        let handler = handlers
            .get(&key(&queued.name))
            .map(|entry| Arc::clone(entry.value()));

        let Some(handler) = handler else {
            debug!(event = %queued.name, "No handler registered for push event");
            metrics.record_unhandled();
            continue;
        };

        let event = PushEvent::decode(queued.name, queued.payload, queued.received_at);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&event)));
        match outcome {
            Ok(()) => metrics.record_dispatched(),
            Err(_) => error!(event = %event.name, "Push handler panicked"),
        }
    }
    debug!("Dispatcher worker stopped");
}

fn key(event_name: &str) -> String {
    event_name.to_lowercase()
}
