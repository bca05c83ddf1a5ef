//! Seams between the connection driver and the socket it runs over.

use std::fmt;

use tokio::sync::mpsc;

use super::connection::Event;
use crate::error::Error;

/// Close code for a normal, requested closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the peer closed without a status.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code reported when the connection dropped without a close handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Parameters for establishing one transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// WebSocket URL
    pub endpoint: String,
    /// Sub-protocols to offer during the handshake
    pub protocols: Vec<String>,
}

/// Opens transports on behalf of the connection driver.
///
/// `connect` must return immediately. The returned transport reports its
/// progress through `events`: exactly one [`TransportEvent::Opened`] before any
/// message, and exactly one [`TransportEvent::Closed`] at the end of its life,
/// including when the connection attempt itself fails.
///
/// # Example
///
/// ```ignore
/// struct Loopback;
///
/// impl Connector for Loopback {
///     fn connect(&self, _request: ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
///         events.opened();
///         Box::new(LoopbackTransport { events })
///     }
/// }
/// ```
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, request: ConnectRequest, events: TransportEvents) -> Box<dyn Transport>;
}

/// Write half of an established (or establishing) transport.
pub trait Transport: Send {
    /// Queue a text frame for delivery.
    fn send(&mut self, text: String) -> crate::Result<()>;

    /// Begin the close handshake. The transport reports completion with a
    /// [`TransportEvent::Closed`].
    fn close(&mut self, code: u16, reason: Option<String>);
}

/// Something that happened on a transport.
#[non_exhaustive]
#[derive(Debug)]
pub enum TransportEvent {
    /// The handshake completed
    Opened,
    /// The transport is gone
    Closed(CloseInfo),
    /// A non-fatal error; a `Closed` follows if the error ended the connection
    Error(Error),
    /// A text frame arrived
    Message(String),
}

/// Details of a transport closure.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    /// Whether the close handshake completed
    pub was_clean: bool,
}

impl CloseInfo {
    #[must_use]
    pub fn new<S: Into<String>>(code: u16, reason: S, was_clean: bool) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean,
        }
    }

    #[must_use]
    pub fn normal() -> Self {
        Self::new(NORMAL_CLOSURE, "", true)
    }

    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSURE, "", false)
    }
}

/// Event sink handed to each transport, stamped with its generation so the
/// driver can ignore transports it has already replaced.
#[derive(Clone)]
pub struct TransportEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<Event>,
}

impl TransportEvents {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the transport these events belong to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event to the driver. Events sent after the client is gone are discarded.
    pub fn emit(&self, event: TransportEvent) {
        _ = self.tx.send(Event::Transport {
            generation: self.generation,
            event,
        });
    }

    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    pub fn closed(&self, info: CloseInfo) {
        self.emit(TransportEvent::Closed(info));
    }

    pub fn error(&self, error: Error) {
        self.emit(TransportEvent::Error(error));
    }

    pub fn message<S: Into<String>>(&self, text: S) {
        self.emit(TransportEvent::Message(text.into()));
    }
}

impl fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEvents")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
