//! Relay metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Client-side counters for the hub connection and event pipeline.
#[derive(Debug)]
pub struct RelayMetrics {
    /// Hub messages received on any connection
    pub frames_received: AtomicU64,
    /// Push events handed to a handler
    pub events_dispatched: AtomicU64,
    /// Push events with no registered handler
    pub events_unhandled: AtomicU64,
    /// Reconnect attempts made after a drop
    pub reconnect_attempts: AtomicU64,
    /// Successful handshakes, initial or reconnect
    pub connections_established: AtomicU64,
}

impl RelayMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            events_unhandled: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            connections_established: AtomicU64::new(0),
        }
    }

    /// Record one inbound hub message
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handled event
    pub fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event nobody was listening for
    pub fn record_unhandled(&self) {
        self.events_unhandled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reconnect attempt
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed handshake
    pub fn record_connected(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_unhandled: self.events_unhandled.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Hub messages received
    pub frames_received: u64,
    /// Events handed to a handler
    pub events_dispatched: u64,
    /// Events without a handler
    pub events_unhandled: u64,
    /// Reconnect attempts
    pub reconnect_attempts: u64,
    /// Completed handshakes
    pub connections_established: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = RelayMetrics::new();
        metrics.record_frame();
        metrics.record_frame();
        metrics.record_unhandled();
        metrics.record_connected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.events_unhandled, 1);
        assert_eq!(snapshot.connections_established, 1);
        assert_eq!(snapshot.events_dispatched, 0);
    }
}
