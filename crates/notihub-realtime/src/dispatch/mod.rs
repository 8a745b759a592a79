//! Push event decoding and ordered dispatch to handlers.

pub mod dispatcher;
pub mod handler;
pub mod payload;

pub use dispatcher::EventDispatcher;
pub use handler::{Chain, EventHandler, StoreHandler};
pub use payload::{MessagePayload, PushEvent, PushPayload};
