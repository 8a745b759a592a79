//! Shared domain types.

pub mod auth;
pub mod connection;
pub mod id;
pub mod notification;
pub mod registration;

pub use auth::AuthSignal;
pub use connection::{ConnectionState, ConnectionStatus};
pub use id::{DeviceId, NotificationId, UserId};
pub use notification::{
    NewNotification, Notification, NotificationCategory, NotificationPriority,
};
pub use registration::DeviceRegistration;
