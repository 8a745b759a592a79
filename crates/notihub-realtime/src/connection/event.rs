//! Observations published by the connection manager.

use notihub_core::types::{ConnectionState, ConnectionStatus};

/// Something observers of the connection should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The state changed.
    StateChanged {
        /// Status before the change.
        previous: ConnectionStatus,
        /// Full state after the change.
        current: ConnectionState,
    },
    /// A dropped connection was restored by the reconnect policy.
    Reconnected {
        /// New connection id.
        connection_id: String,
    },
}

impl ConnectionEvent {
    /// Human-readable line for status indicators.
    pub fn describe(&self) -> String {
        match self {
            Self::StateChanged { current, .. } => current.describe(),
            Self::Reconnected { connection_id } => {
                format!("Reconnected to notification hub (connection {connection_id})")
            }
        }
    }
}
