//! Local notification store configuration.

use serde::{Deserialize, Serialize};

/// Settings for the local notification store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Seconds after creation at which low priority notifications are removed.
    #[serde(default = "default_auto_dismiss")]
    pub auto_dismiss_seconds: u64,
    /// Maximum notifications kept per user; oldest are trimmed first.
    #[serde(default = "default_max_stored")]
    pub max_stored: usize,
    /// Capacity of the store change broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            auto_dismiss_seconds: default_auto_dismiss(),
            max_stored: default_max_stored(),
            event_buffer_size: default_event_buffer(),
        }
    }
}

fn default_auto_dismiss() -> u64 {
    30
}

fn default_max_stored() -> usize {
    100
}

fn default_event_buffer() -> usize {
    256
}
