//! Hub message records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use notihub_core::error::AppError;
use notihub_core::result::AppResult;

use super::RECORD_SEPARATOR;

const INVOCATION: u8 = 1;
const STREAM_ITEM: u8 = 2;
const COMPLETION: u8 = 3;
const STREAM_INVOCATION: u8 = 4;
const CANCEL_INVOCATION: u8 = 5;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// A decoded hub message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// The hub calls a client method.
    Invocation {
        /// Present when the caller expects a completion.
        invocation_id: Option<String>,
        /// Client method name.
        target: String,
        /// Method arguments.
        arguments: Vec<Value>,
    },
    /// One item of a streaming result.
    StreamItem {
        /// Stream id.
        invocation_id: String,
        /// Item value.
        item: Value,
    },
    /// Result of an invocation.
    Completion {
        /// Invocation id.
        invocation_id: String,
        /// Result value.
        result: Option<Value>,
        /// Failure reason.
        error: Option<String>,
    },
    /// Start of a streaming invocation.
    StreamInvocation {
        /// Stream id.
        invocation_id: String,
        /// Method name.
        target: String,
        /// Method arguments.
        arguments: Vec<Value>,
    },
    /// Cancel a stream.
    CancelInvocation {
        /// Stream id.
        invocation_id: String,
    },
    /// Keep-alive.
    Ping,
    /// The hub is closing the connection.
    Close {
        /// Reason, when the close is due to an error.
        error: Option<String>,
        /// Whether the client may reconnect.
        allow_reconnect: bool,
    },
    /// A message type this client does not know.
    Other {
        /// Raw type discriminator.
        message_type: u8,
    },
}

/// Flat wire shape shared by every message type.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHubMessage {
    #[serde(rename = "type")]
    message_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_reconnect: Option<bool>,
}

impl HubMessage {
    /// Decode one record (without its separator).
    pub fn parse(record: &str) -> AppResult<Self> {
        let raw: RawHubMessage = serde_json::from_str(record)
            .map_err(|e| AppError::protocol(format!("Malformed hub message: {e}")))?;

        let message = match raw.message_type {
            INVOCATION => Self::Invocation {
                invocation_id: raw.invocation_id,
                target: require(raw.target, "target")?,
                arguments: raw.arguments.unwrap_or_default(),
            },
            STREAM_ITEM => Self::StreamItem {
                invocation_id: require(raw.invocation_id, "invocationId")?,
                item: raw.item.unwrap_or(Value::Null),
            },
            COMPLETION => Self::Completion {
                invocation_id: require(raw.invocation_id, "invocationId")?,
                result: raw.result,
                error: raw.error,
            },
            STREAM_INVOCATION => Self::StreamInvocation {
                invocation_id: require(raw.invocation_id, "invocationId")?,
                target: require(raw.target, "target")?,
                arguments: raw.arguments.unwrap_or_default(),
            },
            CANCEL_INVOCATION => Self::CancelInvocation {
                invocation_id: require(raw.invocation_id, "invocationId")?,
            },
            PING => Self::Ping,
            CLOSE => Self::Close {
                error: raw.error,
                allow_reconnect: raw.allow_reconnect.unwrap_or(false),
            },
            other => Self::Other {
                message_type: other,
            },
        };
        Ok(message)
    }

    /// Encode with the trailing record separator.
    pub fn encode(&self) -> AppResult<String> {
        let raw = match self {
            Self::Invocation {
                invocation_id,
                target,
                arguments,
            } => RawHubMessage {
                message_type: INVOCATION,
                invocation_id: invocation_id.clone(),
                target: Some(target.clone()),
                arguments: Some(arguments.clone()),
                ..RawHubMessage::default()
            },
            Self::StreamItem {
                invocation_id,
                item,
            } => RawHubMessage {
                message_type: STREAM_ITEM,
                invocation_id: Some(invocation_id.clone()),
                item: Some(item.clone()),
                ..RawHubMessage::default()
            },
            Self::Completion {
                invocation_id,
                result,
                error,
            } => RawHubMessage {
                message_type: COMPLETION,
                invocation_id: Some(invocation_id.clone()),
                result: result.clone(),
                error: error.clone(),
                ..RawHubMessage::default()
            },
            Self::StreamInvocation {
                invocation_id,
                target,
                arguments,
            } => RawHubMessage {
                message_type: STREAM_INVOCATION,
                invocation_id: Some(invocation_id.clone()),
                target: Some(target.clone()),
                arguments: Some(arguments.clone()),
                ..RawHubMessage::default()
            },
            Self::CancelInvocation { invocation_id } => RawHubMessage {
                message_type: CANCEL_INVOCATION,
                invocation_id: Some(invocation_id.clone()),
                ..RawHubMessage::default()
            },
            Self::Ping => RawHubMessage {
                message_type: PING,
                ..RawHubMessage::default()
            },
            Self::Close {
                error,
                allow_reconnect,
            } => RawHubMessage {
                message_type: CLOSE,
                error: error.clone(),
                allow_reconnect: Some(*allow_reconnect),
                ..RawHubMessage::default()
            },
            Self::Other { message_type } => {
                return Err(AppError::protocol(format!(
                    "Cannot encode unknown message type {message_type}"
                )));
            }
        };

        let mut text = serde_json::to_string(&raw)?;
        text.push(RECORD_SEPARATOR);
        Ok(text)
    }

    /// Collapse invocation arguments into the single payload the dispatcher
    /// consumes: nothing becomes `null`, one argument is passed through, and
    /// several arguments become an array.
    pub fn payload_from_arguments(mut arguments: Vec<Value>) -> Value {
        match arguments.len() {
            0 => Value::Null,
            1 => arguments.remove(0),
            _ => Value::Array(arguments),
        }
    }
}

fn require(field: Option<String>, name: &str) -> AppResult<String> {
    field.ok_or_else(|| AppError::protocol(format!("Hub message is missing '{name}'")))
}
