use tokio::sync::watch;

use super::registry::SubscriptionRegistry;
use super::types::response::{InboundMessage, parse_message};
use crate::error::{Error, ErrorContext};
use crate::ws::connection::TransportHandle;
use crate::ws::hooks::{ErrorSink, Hooks};

/// What happened to one inbound frame.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Acknowledgement of our heartbeat, discarded
    HeartbeatAck,
    /// Not valid JSON or not shaped like a frame, reported and discarded
    Malformed,
    /// Handed to the channel's subscriber
    Delivered,
    /// The server flagged the update as failed, reported to the error sink
    Rejected,
    /// No subscription for the frame's channel
    Unrouted,
}

/// Classifies inbound frames and dispatches them to subscribers.
pub struct MessageRouter {
    endpoint: String,
    hooks: Hooks,
    error_sink: ErrorSink,
    last_message: watch::Sender<Option<InboundMessage>>,
}

impl MessageRouter {
    pub(crate) fn new(
        endpoint: String,
        hooks: Hooks,
        error_sink: ErrorSink,
        last_message: watch::Sender<Option<InboundMessage>>,
    ) -> Self {
        Self {
            endpoint,
            hooks,
            error_sink,
            last_message,
        }
    }

    /// Route one raw text frame.
    ///
    /// Every frame that parses and is not a heartbeat acknowledgement updates the
    /// last-message cell and reaches the `on_message` hook exactly once, before
    /// any channel-level dispatch.
    pub fn route(
        &self,
        text: &str,
        registry: &SubscriptionRegistry,
        handle: &TransportHandle,
    ) -> RouteOutcome {
        let mut message = match parse_message(text) {
            Ok(message) => message,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, error = %e, "Failed to parse WebSocket message");
                self.error_sink
                    .report(&e, &ErrorContext::new(self.endpoint.as_str()));
                return RouteOutcome::Malformed;
            }
        };

        if message.is_heartbeat_ack() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Heartbeat acknowledged");
            return RouteOutcome::HeartbeatAck;
        }

        self.last_message.send_replace(Some(message.clone()));
        self.hooks.message(handle, &message);

        let Some(subscription) = message.channel.as_deref().and_then(|c| registry.get(c)) else {
            return RouteOutcome::Unrouted;
        };

        if message.is_success() {
            message.normalize();
            #[cfg(feature = "tracing")]
            tracing::trace!(channel = %subscription.channel(), "Delivering channel update");
            subscription.deliver(&message);
            RouteOutcome::Delivered
        } else {
            let context = ErrorContext::new(subscription.channel());
            self.error_sink.report(&Error::channel(message), &context);
            RouteOutcome::Rejected
        }
    }
}
