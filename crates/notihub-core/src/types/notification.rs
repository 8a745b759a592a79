//! Notification record, category and priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::NotificationId;

/// Notification category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    /// Informational message
    #[default]
    Info,
    /// A completed action
    Success,
    /// Needs attention soon
    Warning,
    /// Something failed
    Error,
    /// Meeting request or update
    Meeting,
    /// Someone liked or favorited something
    Like,
    /// Platform-level announcement
    System,
}

impl NotificationCategory {
    /// Parse from string; unknown values map to `Info`.
    pub fn from_str_value(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "success" => Self::Success,
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            "meeting" => Self::Meeting,
            "like" => Self::Like,
            "system" => Self::System,
            _ => Self::Info,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Meeting => "meeting",
            Self::Like => "like",
            Self::System => "system",
        }
    }
}

/// Notification priority levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Low priority, dismissed automatically
    Low,
    /// Normal priority
    #[default]
    Medium,
    /// Important
    High,
}

impl NotificationPriority {
    /// Parse from string; unknown values map to `Medium`.
    pub fn from_str_value(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "urgent" | "critical" => Self::High,
            _ => Self::Medium,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Whether notifications of this priority are removed after a fixed delay
    pub fn auto_dismisses(&self) -> bool {
        matches!(self, Self::Low)
    }
}

/// One delivered or locally generated alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique within the store for the process lifetime.
    pub id: NotificationId,
    /// Short heading.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Category.
    pub category: NotificationCategory,
    /// Priority.
    pub priority: NotificationPriority,
    /// Whether the user has seen it.
    #[serde(default)]
    pub read: bool,
    /// When it entered the store.
    pub created_at: DateTime<Utc>,
    /// After this instant it is hidden from active views.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Link the UI opens when the notification is activated.
    #[serde(default)]
    pub action_url: Option<String>,
    /// Label for the action link.
    #[serde(default)]
    pub action_label: Option<String>,
    /// Who sent it, for pushed messages.
    #[serde(default)]
    pub sender: Option<String>,
    /// When the hub says it was sent.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// Free-form data attached by the sender.
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl Notification {
    /// Whether the expiry timestamp has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the notification has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Input for adding a notification; the store assigns id, timestamp and read flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// Short heading.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Category.
    #[serde(default)]
    pub category: NotificationCategory,
    /// Priority.
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Expiry instant.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Action link.
    #[serde(default)]
    pub action_url: Option<String>,
    /// Action label.
    #[serde(default)]
    pub action_label: Option<String>,
    /// Sender name.
    #[serde(default)]
    pub sender: Option<String>,
    /// Hub timestamp.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// Free-form data.
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl NewNotification {
    /// Start a notification with a title and message.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the category.
    pub fn category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the expiry instant.
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Attach an action link and label.
    pub fn action(mut self, url: impl Into<String>, label: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_label = Some(label.into());
        self
    }

    /// Set the sender name.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Set the hub timestamp.
    pub fn sent_at(mut self, at: DateTime<Utc>) -> Self {
        self.sent_at = Some(at);
        self
    }

    /// Insert one payload entry.
    pub fn payload_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Materialize with a fresh id and creation time.
    pub fn into_notification(self, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            title: self.title,
            message: self.message,
            category: self.category,
            priority: self.priority,
            read: false,
            created_at,
            expires_at: self.expires_at,
            action_url: self.action_url,
            action_label: self.action_label,
            sender: self.sender,
            sent_at: self.sent_at,
            payload: self.payload,
        }
    }
}
