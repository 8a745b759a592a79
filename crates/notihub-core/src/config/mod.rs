//! Client configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod hub;
pub mod logging;
pub mod notifications;
pub mod push;
pub mod session;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::hub::{HubConfig, ReconnectConfig, TransportMode};
pub use self::logging::LoggingConfig;
pub use self::notifications::NotificationConfig;
pub use self::push::PushConfig;
pub use self::session::SessionConfig;
pub use self::storage::{StorageBackend, StorageConfig};

use crate::error::AppError;

/// Root client configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay) and `NOTIHUB__*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hub endpoint and transport settings.
    #[serde(default)]
    pub hub: HubConfig,
    /// Reconnection backoff settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Local notification store settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Durable storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Browser/device push settings.
    #[serde(default)]
    pub push: PushConfig,
    /// Session (auth signal) settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `NOTIHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOTIHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
