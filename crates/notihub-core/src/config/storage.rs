//! Durable storage configuration.

use serde::{Deserialize, Serialize};

/// Durable storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One JSON document per key under `directory`.
    File,
    /// Process memory only; nothing survives a restart.
    Memory,
}

/// Durable storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Directory for the file backend.
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            directory: default_directory(),
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_directory() -> String {
    "./data/notihub".to_string()
}
