//! Closed set of push payload shapes and their normalization.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use notihub_core::types::{NewNotification, NotificationCategory, NotificationPriority};

/// Fields accepted on an object-shaped push payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePayload {
    /// Body text.
    pub message: String,
    /// Display name of the sender.
    pub sender_name: Option<String>,
    /// ISO-8601 send time, as received.
    pub timestamp: Option<String>,
    /// Heading.
    pub title: Option<String>,
    /// Category name.
    pub category: Option<String>,
    /// Priority name.
    pub priority: Option<String>,
    /// ISO-8601 expiry, as received.
    pub expires_at: Option<String>,
    /// Action link.
    pub action_url: Option<String>,
    /// Action label.
    pub action_label: Option<String>,
    /// Free-form data.
    pub data: Option<Map<String, Value>>,
}

/// A push payload decoded into one of the shapes the hub is known to send.
#[derive(Debug, Clone, PartialEq)]
pub enum PushPayload {
    /// A bare string.
    Text(String),
    /// An object carrying at least a message body.
    Message(MessagePayload),
    /// Two string arguments: sender, then text.
    SenderAndText {
        /// Sender name.
        sender: String,
        /// Body text.
        text: String,
    },
    /// Anything else; kept verbatim.
    Unrecognized(Value),
}

impl PushPayload {
    /// Decode a raw payload. Total: unknown shapes become `Unrecognized`.
    pub fn decode(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => match message_payload(&map) {
                Some(message) => Self::Message(message),
                None => Self::Unrecognized(Value::Object(map)),
            },
            Value::Array(items) => match items.as_slice() {
                [Value::String(sender), Value::String(text)] => Self::SenderAndText {
                    sender: sender.clone(),
                    text: text.clone(),
                },
                _ => Self::Unrecognized(Value::Array(items)),
            },
            other => Self::Unrecognized(other),
        }
    }

    /// Normalize into a notification for the store.
    ///
    /// Category defaults to `info` and priority to `medium`. The message is
    /// never empty. Timestamps that do not parse are kept as text in the
    /// payload map under their field name.
    pub fn into_notification(self, event_name: &str) -> NewNotification {
        let fallback = format!("{event_name} received");

        let new = match self {
            Self::Text(text) => NewNotification::new(DEFAULT_TITLE, non_empty(text, &fallback)),
            Self::SenderAndText { sender, text } => {
                NewNotification::new(format!("Message from {sender}"), non_empty(text, &fallback))
                    .sender(sender)
            }
            Self::Message(payload) => from_message(payload, &fallback),
            Self::Unrecognized(raw) => {
                let text = match &raw {
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                NewNotification::new(DEFAULT_TITLE, non_empty(text, &fallback))
                    .payload_entry("raw", raw)
            }
        };

        new.payload_entry("event", Value::String(event_name.to_string()))
    }
}

/// A push event after decoding, as seen by handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    /// Hub event name as received.
    pub name: String,
    /// Decoded payload.
    pub payload: PushPayload,
    /// Normalized notification, ready for the store.
    pub notification: NewNotification,
    /// When the client received it.
    pub received_at: DateTime<Utc>,
}

impl PushEvent {
    /// Decode and normalize a raw payload.
    pub fn decode(name: impl Into<String>, raw: Value, received_at: DateTime<Utc>) -> Self {
        let name = name.into();
        let payload = PushPayload::decode(raw);
        let notification = payload.clone().into_notification(&name);
        Self {
            name,
            payload,
            notification,
            received_at,
        }
    }
}

const DEFAULT_TITLE: &str = "New notification";

fn from_message(payload: MessagePayload, fallback: &str) -> NewNotification {
    let title = payload
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            payload
                .sender_name
                .as_ref()
                .map(|sender| format!("Message from {sender}"))
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut new = NewNotification::new(title, non_empty(payload.message, fallback))
        .category(
            payload
                .category
                .as_deref()
                .map(NotificationCategory::from_str_value)
                .unwrap_or_default(),
        )
        .priority(
            payload
                .priority
                .as_deref()
                .map(NotificationPriority::from_str_value)
                .unwrap_or_default(),
        );

    if let Some(sender) = payload.sender_name {
        new = new.sender(sender);
    }
    if let Some(raw) = payload.timestamp {
        new = match parse_instant(&raw) {
            Some(at) => new.sent_at(at),
            None => new.payload_entry("timestamp", Value::String(raw)),
        };
    }
    if let Some(raw) = payload.expires_at {
        new = match parse_instant(&raw) {
            Some(at) => new.expires_at(at),
            None => new.payload_entry("expiresAt", Value::String(raw)),
        };
    }
    if let Some(url) = payload.action_url {
        let label = payload.action_label.unwrap_or_else(|| "View".to_string());
        new = new.action(url, label);
    }
    if let Some(data) = payload.data {
        for (key, value) in data {
            new = new.payload_entry(key, value);
        }
    }
    new
}

fn message_payload(map: &Map<String, Value>) -> Option<MessagePayload> {
    let message = text_field(map, &["message", "body", "content", "text"])?;
    let data = match map.get("data") {
        Some(Value::Object(data)) => Some(data.clone()),
        Some(Value::Null) | None => None,
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), other.clone());
            Some(wrapped)
        }
    };

    Some(MessagePayload {
        message,
        sender_name: text_field(map, &["senderName", "sender", "from"]),
        timestamp: text_field(map, &["timestamp", "sentAt"]),
        title: text_field(map, &["title", "subject"]),
        category: text_field(map, &["category", "type"]),
        priority: text_field(map, &["priority"]),
        expires_at: text_field(map, &["expiresAt"]),
        action_url: text_field(map, &["actionUrl", "url"]),
        action_label: text_field(map, &["actionLabel"]),
        data,
    })
}

/// First present field among `keys`, as text. Numbers and booleans are
/// rendered; objects, arrays and null count as absent.
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

fn non_empty(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
