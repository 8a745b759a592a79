//! Session configuration for the relay binary.

use serde::{Deserialize, Serialize};

/// Where the relay finds the signed-in user and their access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Opaque identifier of the signed-in user, if any.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Durable storage key holding the current access token.
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            token_key: default_token_key(),
        }
    }
}

fn default_token_key() -> String {
    "auth_token".to_string()
}
