//! Device identity and login-time registration.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use notihub_core::config::PushConfig;
use notihub_core::result::AppResult;
use notihub_core::traits::{DurableStorage, TokenProvider};
use notihub_core::types::{DeviceId, DeviceRegistration, UserId};
use notihub_store::keys::device_id_key;

use super::client::RegistrationClient;

/// Read the persisted device id, creating and storing one on first use.
///
/// An unreadable stored value is replaced.
pub fn load_or_create_device_id(storage: &dyn DurableStorage) -> AppResult<DeviceId> {
    let key = device_id_key();
    if let Some(raw) = storage.get(key)? {
        match DeviceId::from_str(raw.trim()) {
            Ok(id) => return Ok(id),
            Err(_) => warn!(value = %raw, "Stored device id is invalid; generating a new one"),
        }
    }
    let id = DeviceId::new();
    storage.set(key, &id.to_string())?;
    debug!(device_id = %id, "Generated device id");
    Ok(id)
}

/// Registers this device for a user when push delivery is configured.
#[derive(Debug)]
pub struct DeviceRegistrar {
    client: RegistrationClient,
    push: PushConfig,
    storage: Arc<dyn DurableStorage>,
    tokens: Arc<dyn TokenProvider>,
}

impl DeviceRegistrar {
    /// Create a registrar.
    pub fn new(
        client: RegistrationClient,
        push: PushConfig,
        storage: Arc<dyn DurableStorage>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            client,
            push,
            storage,
            tokens,
        }
    }

    /// Register this device for `user_id`.
    ///
    /// Returns `Ok(false)` when push delivery is disabled, no access token is
    /// available, or the same registration was already accepted.
    pub async fn register(&self, user_id: &UserId) -> AppResult<bool> {
        let Some(device_token) = self.push.device_token.as_deref() else {
            return Ok(false);
        };
        let Some(access_token) = self.tokens.access_token().await? else {
            debug!(user_id = %user_id, "Skipping device registration without an access token");
            return Ok(false);
        };

        let device_id = load_or_create_device_id(self.storage.as_ref())?;
        let registration =
            DeviceRegistration::new(user_id.clone(), device_token, &self.push.platform, device_id);
        self.client.register(&registration, &access_token).await
    }

    /// Remove this device's registration from the hub.
    ///
    /// Returns `Ok(false)` when no access token is available to authorize
    /// the request.
    pub async fn unregister(&self) -> AppResult<bool> {
        let Some(access_token) = self.tokens.access_token().await? else {
            debug!("Skipping device unregistration without an access token");
            return Ok(false);
        };
        let device_id = load_or_create_device_id(self.storage.as_ref())?;
        self.client.unregister(&device_id, &access_token).await?;
        Ok(true)
    }

    /// Forget the cached registration (on sign-out).
    pub fn forget(&self) {
        self.client.forget();
    }
}
