use std::fmt;
use std::sync::Arc;

use super::connection::TransportHandle;
use super::traits::CloseInfo;
use crate::channel::types::response::InboundMessage;
use crate::error::{Error, ErrorContext};

pub type ConnectedHook = Arc<dyn Fn(&TransportHandle) + Send + Sync>;
pub type DisconnectedHook = Arc<dyn Fn(&TransportHandle, &CloseInfo) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&TransportHandle, &Error) + Send + Sync>;
pub type MessageHook = Arc<dyn Fn(&TransportHandle, &InboundMessage) + Send + Sync>;

/// Optional callbacks invoked by the connection driver.
///
/// All hooks run on the driver task, after the connection status has been
/// published, so [`crate::Client::status`] already reflects the transition.
#[derive(Clone, Default)]
pub struct Hooks {
    on_connected: Option<ConnectedHook>,
    on_disconnected: Option<DisconnectedHook>,
    on_error: Option<ErrorHook>,
    on_message: Option<MessageHook>,
}

impl Hooks {
    /// Called when a transport finishes opening.
    #[must_use]
    pub fn on_connected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportHandle) + Send + Sync + 'static,
    {
        self.on_connected = Some(Arc::new(hook));
        self
    }

    /// Called when a transport closes, whether requested or not.
    #[must_use]
    pub fn on_disconnected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportHandle, &CloseInfo) + Send + Sync + 'static,
    {
        self.on_disconnected = Some(Arc::new(hook));
        self
    }

    /// Called for every transport error.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportHandle, &Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Called once for every inbound frame that is not a heartbeat acknowledgement.
    #[must_use]
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportHandle, &InboundMessage) + Send + Sync + 'static,
    {
        self.on_message = Some(Arc::new(hook));
        self
    }

    pub(crate) fn connected(&self, handle: &TransportHandle) {
        if let Some(hook) = &self.on_connected {
            hook(handle);
        }
    }

    pub(crate) fn disconnected(&self, handle: &TransportHandle, info: &CloseInfo) {
        if let Some(hook) = &self.on_disconnected {
            hook(handle, info);
        }
    }

    pub(crate) fn error(&self, handle: &TransportHandle, error: &Error) {
        if let Some(hook) = &self.on_error {
            hook(handle, error);
        }
    }

    pub(crate) fn message(&self, handle: &TransportHandle, message: &InboundMessage) {
        if let Some(hook) = &self.on_message {
            hook(handle, message);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_connected", &self.on_connected.is_some())
            .field("on_disconnected", &self.on_disconnected.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

/// Destination for every error the client reports.
///
/// Transport errors and malformed frames carry the endpoint as context, channel
/// errors carry the channel identifier.
#[derive(Clone, Default)]
pub struct ErrorSink(Option<Arc<dyn Fn(&Error, &ErrorContext) + Send + Sync>>);

impl ErrorSink {
    #[must_use]
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&Error, &ErrorContext) + Send + Sync + 'static,
    {
        Self(Some(Arc::new(sink)))
    }

    pub(crate) fn report(&self, error: &Error, context: &ErrorContext) {
        #[cfg(feature = "tracing")]
        tracing::warn!(url = %context.url, error = %error, "Reporting client error");

        if let Some(sink) = &self.0 {
            sink(error, context);
        }
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorSink").field(&self.0.is_some()).finish()
    }
}
