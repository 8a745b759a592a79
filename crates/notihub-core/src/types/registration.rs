//! Device registration payload for out-of-band push delivery.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{DeviceId, UserId};

/// Maps a user's device to a push delivery target on the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    /// Owning user.
    pub user_id: UserId,
    /// Opaque push token issued to this device.
    pub device_token: String,
    /// Platform tag, e.g. `"web"`.
    pub platform: String,
    /// Stable device identifier.
    pub device_id: DeviceId,
    /// Targeting tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl DeviceRegistration {
    /// Creates a registration with the default `user:{id}` tag.
    pub fn new(
        user_id: UserId,
        device_token: impl Into<String>,
        platform: impl Into<String>,
        device_id: DeviceId,
    ) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("user".to_string(), user_id.to_string());
        Self {
            user_id,
            device_token: device_token.into(),
            platform: platform.into(),
            device_id,
            tags,
        }
    }

    /// Adds a targeting tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}
