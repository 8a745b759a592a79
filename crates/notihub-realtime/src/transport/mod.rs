//! Transport seam between the connection manager and the hub.

pub mod websocket;

use async_trait::async_trait;

use notihub_core::result::AppResult;

use crate::protocol::message::HubMessage;

pub use websocket::WsHubConnector;

/// Opens authenticated connections to the hub.
#[async_trait]
pub trait HubConnector: Send + Sync + std::fmt::Debug + 'static {
    /// Perform the full handshake using `access_token`.
    ///
    /// Returns a live connection or a `Connection`/`Authentication` error.
    async fn connect(&self, access_token: &str) -> AppResult<Box<dyn HubConnection>>;
}

/// One live hub connection, exclusively owned by the connection manager.
#[async_trait]
pub trait HubConnection: Send + std::fmt::Debug {
    /// Identifier assigned during the handshake.
    fn connection_id(&self) -> &str;

    /// Wait for the next message.
    ///
    /// `None` means the transport closed; an error means it failed. Both are
    /// treated as a drop by the caller.
    async fn next_message(&mut self) -> Option<AppResult<HubMessage>>;

    /// Send one message.
    async fn send(&mut self, message: &HubMessage) -> AppResult<()>;

    /// Tear the transport down. Closing twice succeeds.
    async fn close(&mut self) -> AppResult<()>;
}
