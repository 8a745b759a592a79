//! Shared connection state cell.

use std::sync::Mutex;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use notihub_core::types::{ConnectionState, ConnectionStatus};

use super::event::ConnectionEvent;

/// Holds the current state and publishes every change in order.
#[derive(Debug)]
pub struct StateCell {
    current: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    /// Serializes publish so watch and broadcast observers see one order.
    publish: Mutex<()>,
}

impl StateCell {
    /// Creates a cell in the `disconnected` state.
    pub fn new(event_buffer: usize) -> Self {
        let (current, _) = watch::channel(ConnectionState::disconnected());
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            current,
            events,
            publish: Mutex::new(()),
        }
    }

    /// Current state snapshot. Never blocks on I/O.
    pub fn get(&self) -> ConnectionState {
        self.current.borrow().clone()
    }

    /// Move to `next` and notify observers.
    pub fn transition(&self, next: ConnectionState) {
        let _guard = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.current.send_replace(next.clone());

        match next.status {
            ConnectionStatus::Error => warn!(
                from = %previous.status,
                to = %next.status,
                "{}",
                next.describe()
            ),
            _ => info!(from = %previous.status, to = %next.status, "{}", next.describe()),
        }

        let _ = self.events.send(ConnectionEvent::StateChanged {
            previous: previous.status,
            current: next,
        });
    }

    /// Publish a non-transition event.
    pub fn emit(&self, event: ConnectionEvent) {
        let _guard = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        info!("{}", event.describe());
        let _ = self.events.send(event);
    }

    /// Subscribe to every event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Latest-value view of the state.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.current.subscribe()
    }
}
