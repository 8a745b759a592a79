//! HTTP client for the device registration API.

use std::sync::Mutex;

use reqwest::{StatusCode, Url};
use tracing::{debug, info};

use notihub_core::config::AppConfig;
use notihub_core::error::{AppError, ErrorKind};
use notihub_core::result::AppResult;
use notihub_core::types::{DeviceId, DeviceRegistration};

const DEVICES_PATH: &str = "api/notifications/devices";

/// Registers devices with the hub so it can push to them later.
///
/// Keeps the last successful registration to skip identical repeats; a
/// changed device token or tag set registers again.
#[derive(Debug)]
pub struct RegistrationClient {
    http: reqwest::Client,
    base_url: Url,
    registered: Mutex<Option<DeviceRegistration>>,
}

impl RegistrationClient {
    /// Client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> AppResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            AppError::configuration(format!("Invalid registration API URL '{base_url}': {e}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            registered: Mutex::new(None),
        })
    }

    /// Uses `push.api_base_url`, or the hub URL's origin when unset.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        match &config.push.api_base_url {
            Some(base) => Self::new(base),
            None => {
                let hub = Url::parse(&config.hub.url).map_err(|e| {
                    AppError::configuration(format!("Invalid hub URL '{}': {e}", config.hub.url))
                })?;
                Self::new(&hub.origin().ascii_serialization())
            }
        }
    }

    /// Register `registration`. Returns `false` when an identical
    /// registration was already accepted.
    pub async fn register(
        &self,
        registration: &DeviceRegistration,
        access_token: &str,
    ) -> AppResult<bool> {
        if self.cached().as_ref() == Some(registration) {
            debug!(device_id = %registration.device_id, "Device already registered");
            return Ok(false);
        }

        let url = self.devices_url(None)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(registration)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Device registration request failed: {e}"),
                    e,
                )
            })?;
        check_status(response.status(), "Device registration")?;

        info!(
            device_id = %registration.device_id,
            user_id = %registration.user_id,
            platform = %registration.platform,
            "Device registered for push delivery"
        );
        *self.lock() = Some(registration.clone());
        Ok(true)
    }

    /// Remove a device registration from the hub.
    pub async fn unregister(&self, device_id: &DeviceId, access_token: &str) -> AppResult<()> {
        let url = self.devices_url(Some(device_id))?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Device unregistration request failed: {e}"),
                    e,
                )
            })?;
        if response.status() != StatusCode::NOT_FOUND {
            check_status(response.status(), "Device unregistration")?;
        }

        info!(device_id = %device_id, "Device unregistered");
        self.forget();
        Ok(())
    }

    /// The last accepted registration.
    pub fn cached(&self) -> Option<DeviceRegistration> {
        self.lock().clone()
    }

    /// Drop the cached registration so the next `register` always sends.
    pub fn forget(&self) {
        *self.lock() = None;
    }

    fn devices_url(&self, device_id: Option<&DeviceId>) -> AppResult<Url> {
        let path = match device_id {
            Some(id) => format!("{DEVICES_PATH}/{id}"),
            None => DEVICES_PATH.to_string(),
        };
        self.base_url
            .join(&path)
            .map_err(|e| AppError::configuration(format!("Invalid registration URL: {e}")))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<DeviceRegistration>> {
        self.registered.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn remember(&self, registration: DeviceRegistration) {
        *self.lock() = Some(registration);
    }
}

fn check_status(status: StatusCode, what: &str) -> AppResult<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::authentication(
            format!("{what} rejected the access token ({status})"),
        )),
        _ => Err(AppError::external_service(format!(
            "{what} failed with status {status}"
        ))),
    }
}
