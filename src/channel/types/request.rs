use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel registration request.
///
/// Serialized as `{"event":"addChannel","channel":"..."}` or the
/// `removeChannel` equivalent.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    /// Whether the channel is being added or removed
    pub event: ChannelEvent,
    /// Channel identifier
    pub channel: String,
}

impl ControlFrame {
    /// Create an `addChannel` request.
    #[must_use]
    pub fn add<S: Into<String>>(channel: S) -> Self {
        Self {
            event: ChannelEvent::AddChannel,
            channel: channel.into(),
        }
    }

    /// Create a `removeChannel` request.
    #[must_use]
    pub fn remove<S: Into<String>>(channel: S) -> Self {
        Self {
            event: ChannelEvent::RemoveChannel,
            channel: channel.into(),
        }
    }
}

/// The frame that established a subscription, replayed verbatim after reconnects.
///
/// Subscriptions made through the registry hold the canonical [`ControlFrame`];
/// those registered by a raw send keep the caller's frame untouched, including
/// any extra fields or decorated event names.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelRequest {
    Control(ControlFrame),
    Raw(Value),
}

impl From<ControlFrame> for ChannelRequest {
    fn from(frame: ControlFrame) -> Self {
        Self::Control(frame)
    }
}

/// Channel registration action.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ChannelEvent {
    /// Start receiving updates for a channel
    AddChannel,
    /// Stop receiving updates for a channel
    RemoveChannel,
}

impl ChannelEvent {
    /// Classify a raw `event` value.
    ///
    /// Matching is by containment so decorated event names still funnel
    /// through registry bookkeeping.
    #[must_use]
    pub fn detect(event: &str) -> Option<Self> {
        if event.contains("addChannel") {
            Some(Self::AddChannel)
        } else if event.contains("removeChannel") {
            Some(Self::RemoveChannel)
        } else {
            None
        }
    }
}

/// Keep-alive frame: `{"ping":"<unix millis>"}`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeartbeatFrame {
    pub ping: String,
}

impl HeartbeatFrame {
    /// Heartbeat stamped with the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            ping: Utc::now().timestamp_millis().to_string(),
        }
    }
}
