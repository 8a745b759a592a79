//! Durable key/value storage trait.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::result::AppResult;

/// Client-side persisted key/value storage that survives restarts.
///
/// Operations are synchronous: the notification store mirrors every
/// mutation inline and must never suspend.
pub trait DurableStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key.
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> AppResult<()>;

    /// List keys starting with `prefix`.
    fn keys(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

impl dyn DurableStorage {
    /// Get a typed value by deserializing from JSON.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}
