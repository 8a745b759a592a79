//! Negotiation response returned by `POST {hub}/negotiate`.

use serde::{Deserialize, Serialize};

/// Transport advertised by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTransport {
    /// Transport name, e.g. `"WebSockets"`.
    pub transport: String,
    /// Supported transfer formats.
    #[serde(default)]
    pub transfer_formats: Vec<String>,
}

/// Body of a negotiate response.
///
/// Either describes a connection (`connection_id`, transports) or redirects
/// the client elsewhere (`url` + `access_token`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    /// Public connection id.
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Token used as the `id` query parameter (negotiate version 1).
    #[serde(default)]
    pub connection_token: Option<String>,
    /// Negotiate protocol version the hub speaks.
    #[serde(default)]
    pub negotiate_version: u32,
    /// Transports the hub offers.
    #[serde(default)]
    pub available_transports: Vec<AvailableTransport>,
    /// Redirect target.
    #[serde(default)]
    pub url: Option<String>,
    /// Token to present at the redirect target.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Negotiation failure reason.
    #[serde(default)]
    pub error: Option<String>,
}

impl NegotiateResponse {
    /// Whether the hub accepts WebSocket connections.
    pub fn supports_websockets(&self) -> bool {
        self.available_transports.is_empty()
            || self
                .available_transports
                .iter()
                .any(|t| t.transport.eq_ignore_ascii_case("WebSockets"))
    }

    /// The value to pass as the `id` query parameter.
    pub fn socket_id(&self) -> Option<&str> {
        self.connection_token
            .as_deref()
            .or(self.connection_id.as_deref())
    }
}
