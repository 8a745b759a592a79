//! Glue between the host's auth signal and the connection lifecycle.

pub mod bridge;
pub mod token;

pub use bridge::{SessionBridge, SessionContext};
pub use token::{StaticTokenProvider, StoredTokenProvider};
