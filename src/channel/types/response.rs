use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Kind};
use crate::ws::WsError;

/// Reserved key carried by heartbeat acknowledgements.
pub const HEARTBEAT_ACK_KEY: &str = "tong";

/// Value of `first` that marks a frame whose `ticker` must be aliased into `data`.
pub const SNAPSHOT_MARKER: &str = "0";

/// Inbound frame received over the connection.
///
/// Only the routing fields are typed; everything else the server sends is kept
/// in [`InboundMessage::extra`] so callbacks see the full payload.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel the update belongs to. A non-string `channel` reads as `None`.
    #[serde(
        default,
        deserialize_with = "deserialize_channel",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel: Option<String>,
    /// Whether the server reports the update as successful
    #[serde(
        default,
        deserialize_with = "deserialize_truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub success: Option<bool>,
    /// Normalization hint, `"0"` for snapshot frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<Value>,
    /// Raw ticker payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<Value>,
    /// Canonical payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundMessage {
    /// Whether this frame acknowledges one of our heartbeats.
    #[must_use]
    pub fn is_heartbeat_ack(&self) -> bool {
        self.extra.get(HEARTBEAT_ACK_KEY).is_some_and(is_truthy)
    }

    /// Whether the server flagged the update as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }

    /// Alias `ticker` into `data` when `first` is the snapshot marker.
    pub fn normalize(&mut self) {
        if self.first.as_ref().and_then(Value::as_str) == Some(SNAPSHOT_MARKER) {
            self.data = self.ticker.clone();
        }
    }
}

/// Parse one inbound text frame.
///
/// Every JSON object parses; field types are read leniently. Text that is not
/// JSON, or JSON that is not an object, is reported as [`Kind::MalformedFrame`].
pub fn parse_message(text: &str) -> crate::Result<InboundMessage> {
    serde_json::from_str(text)
        .map_err(|e| Error::with_source(Kind::MalformedFrame, WsError::MessageParse(e)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(is_truthy(&other)),
    })
}

fn deserialize_channel<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(channel) => Some(channel),
        _ => None,
    })
}
