#![expect(
    clippy::module_name_repetitions,
    reason = "Registry types deliberately include the module name for clarity"
)]

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::types::request::{ChannelEvent, ChannelRequest, ControlFrame};
use super::types::response::InboundMessage;

/// Subscriber callback, invoked with every successful update for its channel.
pub type Callback = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Outbound path the registry emits control frames through.
pub trait FrameSender {
    /// Whether frames sent now would reach the server.
    fn is_open(&self) -> bool;

    fn send_frame(&mut self, frame: &ChannelRequest);
}

/// One active channel subscription.
#[derive(Clone)]
pub struct Subscription {
    channel: String,
    original_request: ChannelRequest,
    callback: Option<Callback>,
}

impl Subscription {
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Frame that established the subscription, re-sent on every reconnect.
    #[must_use]
    pub fn original_request(&self) -> &ChannelRequest {
        &self.original_request
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn deliver(&self, message: &InboundMessage) {
        if let Some(callback) = &self.callback {
            callback(message);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("original_request", &self.original_request)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Active subscriptions keyed by channel, in the order they were made.
///
/// Subscriptions outlive transport drops; only [`SubscriptionRegistry::unsubscribe`]
/// and [`SubscriptionRegistry::clear`] remove them.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: IndexMap<String, Subscription>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `channel`, sending `addChannel` right away when connected.
    ///
    /// Returns `false` without sending anything if the channel is already registered.
    pub fn subscribe<S: FrameSender + ?Sized>(
        &mut self,
        channel: &str,
        callback: Option<Callback>,
        sender: &mut S,
    ) -> bool {
        if self.entries.contains_key(channel) {
            #[cfg(feature = "tracing")]
            tracing::debug!(%channel, "Channel already subscribed");
            return false;
        }

        let original_request = ChannelRequest::from(ControlFrame::add(channel));
        if sender.is_open() {
            sender.send_frame(&original_request);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%channel, "Subscribed to channel");

        self.entries.insert(
            channel.to_owned(),
            Subscription {
                channel: channel.to_owned(),
                original_request,
                callback,
            },
        );
        true
    }

    /// Remove `channel`, sending `removeChannel` when connected.
    ///
    /// Returns `false` without sending anything if the channel was not registered.
    pub fn unsubscribe<S: FrameSender + ?Sized>(&mut self, channel: &str, sender: &mut S) -> bool {
        if !self.entries.contains_key(channel) {
            return false;
        }

        if sender.is_open() {
            sender.send_frame(&ControlFrame::remove(channel).into());
        }
        self.entries.shift_remove(channel);

        #[cfg(feature = "tracing")]
        tracing::debug!(%channel, "Unsubscribed from channel");

        true
    }

    /// Re-send every original request in insertion order.
    ///
    /// The server forgets subscriptions with the connection, so every entry is
    /// sent regardless of what was sent before the drop.
    pub fn replay<S: FrameSender + ?Sized>(&self, sender: &mut S) {
        #[cfg(feature = "tracing")]
        if !self.entries.is_empty() {
            tracing::debug!(count = self.entries.len(), "Replaying channel subscriptions");
        }

        for subscription in self.entries.values() {
            sender.send_frame(&subscription.original_request);
        }
    }

    /// Bookkeeping for a raw control frame that is about to be sent as-is.
    ///
    /// An `addChannel` for an unknown channel is registered without a callback
    /// and `frame` itself becomes the request replayed on reconnect. A
    /// `removeChannel` drops the entry. Nothing is sent from here.
    pub fn track(&mut self, event: ChannelEvent, channel: &str, frame: &Value) {
        match event {
            ChannelEvent::AddChannel => {
                if !self.entries.contains_key(channel) {
                    self.entries.insert(
                        channel.to_owned(),
                        Subscription {
                            channel: channel.to_owned(),
                            original_request: ChannelRequest::Raw(frame.clone()),
                            callback: None,
                        },
                    );
                }
            }
            ChannelEvent::RemoveChannel => {
                self.entries.shift_remove(channel);
            }
        }
    }

    /// Drop every subscription without notifying the server.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, channel: &str) -> Option<&Subscription> {
        self.entries.get(channel)
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.entries.contains_key(channel)
    }

    /// Registered channels in replay order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
