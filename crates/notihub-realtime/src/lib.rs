//! # notihub-realtime
//!
//! Client side of the real-time notification hub. Provides:
//!
//! - A connection manager owning one hub connection, with observable state
//!   and automatic reconnection on a fixed backoff schedule
//! - The hub JSON wire protocol and a WebSocket transport with optional
//!   negotiation
//! - An ordered, non-blocking dispatcher that normalizes pushed events into
//!   notifications
//! - Session glue that connects on sign-in and disconnects on sign-out
//! - Device registration for out-of-band push delivery

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod metrics;
pub mod protocol;
pub mod registration;
pub mod session;
pub mod transport;

pub use client::NotificationClient;
pub use connection::{ConnectionEvent, ConnectionManager, ReconnectPolicy};
pub use dispatch::{Chain, EventDispatcher, EventHandler, PushEvent, PushPayload, StoreHandler};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use protocol::message::HubMessage;
pub use registration::{DeviceRegistrar, RegistrationClient};
pub use session::{SessionBridge, SessionContext, StaticTokenProvider, StoredTokenProvider};
pub use transport::{HubConnection, HubConnector, WsHubConnector};
