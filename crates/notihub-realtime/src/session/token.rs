//! Token providers.

use std::sync::Arc;

use async_trait::async_trait;

use notihub_core::result::AppResult;
use notihub_core::traits::{DurableStorage, TokenProvider};

/// Reads the access token from durable storage on every call, so a token
/// rotated by the host is picked up by the next handshake.
#[derive(Debug, Clone)]
pub struct StoredTokenProvider {
    storage: Arc<dyn DurableStorage>,
    key: String,
}

impl StoredTokenProvider {
    /// Provider reading `key` from `storage`.
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn access_token(&self) -> AppResult<Option<String>> {
        let token = self.storage.get(&self.key)?;
        Ok(token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }
}

/// Always returns the same token.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Provider yielding `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider with no token.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> AppResult<Option<String>> {
        Ok(self.token.clone())
    }
}
