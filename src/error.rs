use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use crate::channel::types::response::InboundMessage;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to invalid input or configuration within channel-socket
    Validation,
    /// Internal error from dependencies
    Internal,
    /// Error related to the underlying WebSocket transport
    WebSocket,
    /// A subscribed channel reported an unsuccessful update
    Channel,
    /// An inbound frame could not be parsed
    MalformedFrame,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    #[must_use]
    pub fn channel(frame: InboundMessage) -> Self {
        ChannelError { frame }.into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// An update with `success: false` received for a subscribed channel.
///
/// The offending frame is carried so error sinks can inspect it.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ChannelError {
    pub frame: InboundMessage,
}

impl ChannelError {
    /// The channel that reported the failure, if the frame named one.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.frame.channel.as_deref()
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} reported an unsuccessful update",
            self.channel().unwrap_or("<unknown>")
        )
    }
}

impl StdError for ChannelError {}

impl From<ChannelError> for Error {
    fn from(err: ChannelError) -> Self {
        Error::with_source(Kind::Channel, err)
    }
}

/// Where an error reported to the error sink originated.
///
/// `url` holds the endpoint for transport and parse failures, and the channel
/// identifier for channel failures.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub url: String,
}

impl ErrorContext {
    #[must_use]
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self { url: url.into() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}
