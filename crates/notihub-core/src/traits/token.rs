//! Access token source.

use async_trait::async_trait;

use crate::result::AppResult;

/// Supplies the access token used to authenticate each connection attempt.
///
/// Called once per handshake, including every reconnect attempt, so that
/// rotated tokens are picked up. Implementations must not cache beyond a
/// single call.
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Current access token, or `None` when no user is signed in.
    async fn access_token(&self) -> AppResult<Option<String>>;
}
