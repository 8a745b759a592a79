//! Live transport status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection and none being attempted.
    #[default]
    Disconnected,
    /// Initial handshake in progress.
    Connecting,
    /// Handshake complete; frames are flowing.
    Connected,
    /// Transport dropped; backoff retries in progress.
    Reconnecting,
    /// Gave up; only an explicit start recovers.
    Error,
}

impl ConnectionStatus {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the connection manager's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Current status.
    pub status: ConnectionStatus,
    /// Hub-assigned connection id; only set while connected.
    pub connection_id: Option<String>,
    /// Most recent failure, if any.
    pub last_error: Option<String>,
    /// Reconnect attempt number while reconnecting.
    pub attempt: Option<u32>,
}

impl ConnectionState {
    /// The initial state.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Handshake in progress.
    pub fn connecting() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            ..Self::default()
        }
    }

    /// Live with the given connection id.
    pub fn connected(connection_id: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            connection_id: Some(connection_id.into()),
            ..Self::default()
        }
    }

    /// Retrying after a drop.
    pub fn reconnecting(attempt: u32, last_error: Option<String>) -> Self {
        Self {
            status: ConnectionStatus::Reconnecting,
            connection_id: None,
            last_error,
            attempt: Some(attempt),
        }
    }

    /// Failed.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            last_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether frames can currently flow.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Human-readable status line for status indicators and logs.
    pub fn describe(&self) -> String {
        match self.status {
            ConnectionStatus::Disconnected => "Disconnected from notification hub".to_string(),
            ConnectionStatus::Connecting => "Connecting to notification hub".to_string(),
            ConnectionStatus::Connected => format!(
                "Connected to notification hub (connection {})",
                self.connection_id.as_deref().unwrap_or("unknown")
            ),
            ConnectionStatus::Reconnecting => format!(
                "Connection lost, reconnecting (attempt {})",
                self.attempt.unwrap_or(0)
            ),
            ConnectionStatus::Error => format!(
                "Notification hub unavailable: {}",
                self.last_error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_only_while_connected() {
        assert!(ConnectionState::connected("abc").connection_id.is_some());
        assert!(ConnectionState::reconnecting(1, None).connection_id.is_none());
        assert!(ConnectionState::error("boom").connection_id.is_none());
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            ConnectionState::reconnecting(2, None).describe(),
            "Connection lost, reconnecting (attempt 2)"
        );
        assert!(ConnectionState::error("handshake rejected")
            .describe()
            .contains("handshake rejected"));
    }
}
