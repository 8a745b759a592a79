//! Durable storage key construction.

use notihub_core::types::UserId;

/// Prefix for per-user notification history.
pub const NOTIFICATIONS_PREFIX: &str = "notifications:";

/// Key holding a user's notification history.
pub fn notifications_key(user_id: &UserId) -> String {
    format!("{NOTIFICATIONS_PREFIX}{user_id}")
}

/// Key holding this device's stable identifier.
pub fn device_id_key() -> &'static str {
    "device:id"
}
