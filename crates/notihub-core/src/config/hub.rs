//! Hub endpoint, transport and reconnection configuration.

use serde::{Deserialize, Serialize};

/// How the client reaches the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// POST to `/negotiate` first, then upgrade to a WebSocket.
    Negotiate,
    /// Skip negotiation and open the WebSocket directly.
    #[serde(rename = "websocket_only")]
    WebSocketOnly,
}

/// Hub connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub base URL (http(s) or ws(s)).
    #[serde(default = "default_url")]
    pub url: String,
    /// Transport preference.
    #[serde(default = "default_transport")]
    pub transport: TransportMode,
    /// Handshake timeout in seconds.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
    /// Interval between client keep-alive pings in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_interval_seconds: u64,
    /// Silence from the hub longer than this is treated as a dropped transport.
    #[serde(default = "default_server_timeout")]
    pub server_timeout_seconds: u64,
    /// Hub method names whose payloads become notifications.
    #[serde(default = "default_events")]
    pub notification_events: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            transport: default_transport(),
            handshake_timeout_seconds: default_handshake_timeout(),
            keep_alive_interval_seconds: default_keep_alive(),
            server_timeout_seconds: default_server_timeout(),
            notification_events: default_events(),
        }
    }
}

/// Reconnection backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before each reconnect attempt in milliseconds; the final entry
    /// repeats once the list is exhausted.
    #[serde(default = "default_delays")]
    pub delays_ms: Vec<u64>,
    /// Total reconnect attempts before giving up (0 = unlimited).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_delays(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:5000/hubs/notifications".to_string()
}

fn default_transport() -> TransportMode {
    TransportMode::Negotiate
}

fn default_handshake_timeout() -> u64 {
    15
}

fn default_keep_alive() -> u64 {
    15
}

fn default_server_timeout() -> u64 {
    30
}

fn default_events() -> Vec<String> {
    vec![
        "ReceiveNotification".to_string(),
        "ReceiveMessage".to_string(),
    ]
}

fn default_delays() -> Vec<u64> {
    vec![0, 2_000, 10_000, 30_000]
}

fn default_max_attempts() -> u32 {
    10
}
