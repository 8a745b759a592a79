//! Device push configuration.

use serde::{Deserialize, Serialize};

/// Settings for out-of-band push delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Base URL of the registration API. Falls back to the hub origin when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Public key material for enabling push subscriptions. Opaque to this client.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Platform tag sent with device registrations.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Opaque device token to register, when push delivery is enabled.
    #[serde(default)]
    pub device_token: Option<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            public_key: None,
            platform: default_platform(),
            device_token: None,
        }
    }
}

impl PushConfig {
    /// Whether device registration should run on login.
    pub fn enabled(&self) -> bool {
        self.device_token.is_some()
    }
}

fn default_platform() -> String {
    "web".to_string()
}
