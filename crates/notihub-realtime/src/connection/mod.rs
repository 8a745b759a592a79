//! Connection lifecycle: state machine, reconnect policy, observers.

pub mod event;
pub mod manager;
pub mod policy;
pub mod state;

pub use event::ConnectionEvent;
pub use manager::ConnectionManager;
pub use policy::ReconnectPolicy;
