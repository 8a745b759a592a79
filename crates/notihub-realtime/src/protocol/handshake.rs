//! Protocol handshake records.

use serde::{Deserialize, Serialize};

use notihub_core::error::AppError;
use notihub_core::result::AppResult;

use super::RECORD_SEPARATOR;

/// First record the client sends after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Protocol name.
    pub protocol: String,
    /// Protocol version.
    pub version: u32,
}

impl HandshakeRequest {
    /// The JSON protocol, version 1.
    pub fn json() -> Self {
        Self {
            protocol: "json".to_string(),
            version: 1,
        }
    }

    /// Serialize with the trailing record separator.
    pub fn encode(&self) -> AppResult<String> {
        let mut text = serde_json::to_string(self)?;
        text.push(RECORD_SEPARATOR);
        Ok(text)
    }
}

/// Hub reply to the handshake; an empty object means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

impl HandshakeResponse {
    /// Parse a single handshake record and turn a rejection into an error.
    pub fn parse(record: &str) -> AppResult<Self> {
        let response: Self = serde_json::from_str(record).map_err(|e| {
            AppError::protocol(format!("Malformed handshake response: {e}"))
        })?;
        match &response.error {
            Some(reason) => Err(AppError::connection(format!(
                "Hub rejected handshake: {reason}"
            ))),
            None => Ok(response),
        }
    }
}
