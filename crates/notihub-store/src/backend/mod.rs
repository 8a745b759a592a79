//! Durable storage backends.

pub mod file;
pub mod memory;

use std::sync::Arc;

use tracing::info;

use notihub_core::config::{StorageBackend, StorageConfig};
use notihub_core::result::AppResult;
use notihub_core::traits::DurableStorage;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Open the configured storage backend.
pub fn open_storage(config: &StorageConfig) -> AppResult<Arc<dyn DurableStorage>> {
    let storage: Arc<dyn DurableStorage> = match config.backend {
        StorageBackend::File => Arc::new(FileStorage::new(&config.directory)?),
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    };
    info!(backend = storage.backend_name(), "Durable storage opened");
    Ok(storage)
}
