#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Sleep, sleep};

use super::config::Config;
use super::heartbeat::HeartbeatScheduler;
use super::hooks::{ErrorSink, Hooks};
use super::traits::{
    CloseInfo, ConnectRequest, Connector, NORMAL_CLOSURE, Transport, TransportEvent,
    TransportEvents,
};
use crate::channel::registry::{Callback, FrameSender, SubscriptionRegistry};
use crate::channel::router::MessageRouter;
use crate::channel::types::request::{ChannelEvent, ChannelRequest, HeartbeatFrame};
use crate::channel::types::response::InboundMessage;
use crate::error::{Error, ErrorContext};

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No transport, or the last one has closed
    #[default]
    Closed,
    /// A transport exists but has not finished its handshake
    Connecting,
    /// Frames can be exchanged
    Open,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Identifies the live transport. Each (re)connection gets a new generation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHandle {
    pub generation: u64,
    pub endpoint: String,
}

impl TransportHandle {
    pub(crate) fn new<S: Into<String>>(generation: u64, endpoint: S) -> Self {
        Self {
            generation,
            endpoint: endpoint.into(),
        }
    }
}

/// Requests from [`crate::Client`] handles.
pub(crate) enum Command {
    Open,
    Close {
        code: u16,
        reason: Option<String>,
    },
    Send(Value),
    Subscribe {
        channel: String,
        callback: Option<Callback>,
    },
    Unsubscribe {
        channel: String,
    },
    Channels(oneshot::Sender<Vec<String>>),
}

/// Everything the driver reacts to, delivered through a single ordered queue.
pub(crate) enum Event {
    Command(Command),
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    /// The last client handle was dropped
    Released,
}

/// Receivers for the state the driver publishes.
pub(crate) struct Observers {
    pub(crate) state: watch::Receiver<ConnectionState>,
    pub(crate) last_message: watch::Receiver<Option<InboundMessage>>,
    pub(crate) transport: watch::Receiver<Option<TransportHandle>>,
}

enum Wake {
    Reconnect,
    Heartbeat,
    Event(Option<Event>),
}

/// The one pending reconnect attempt, if any.
#[derive(Default)]
struct ReconnectTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    fn schedule(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep(delay)));
    }

    fn cancel(&mut self) {
        self.sleep = None;
    }

    fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    async fn elapsed(&mut self) {
        match &mut self.sleep {
            Some(sleep) => sleep.as_mut().await,
            None => pending::<()>().await,
        }
    }
}

/// The live transport together with the state observers see.
struct Link {
    endpoint: String,
    transport: Option<Box<dyn Transport>>,
    state_tx: watch::Sender<ConnectionState>,
    handle_tx: watch::Sender<Option<TransportHandle>>,
    error_sink: ErrorSink,
}

impl Link {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Publish a transition. Runs before any hook reacting to it.
    fn set_state(&self, state: ConnectionState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.endpoint, %state, "Connection state changed");
        self.state_tx.send_replace(state);
    }

    fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    fn handle(&self) -> Option<TransportHandle> {
        self.handle_tx.borrow().clone()
    }

    fn attach(&mut self, handle: TransportHandle, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
        self.handle_tx.send_replace(Some(handle));
    }

    fn detach(&mut self) -> Option<TransportHandle> {
        self.transport = None;
        self.handle_tx.send_replace(None)
    }

    fn close(&mut self, code: u16, reason: Option<String>) {
        if let Some(transport) = self.transport.as_mut() {
            transport.close(code, reason);
        }
    }

    /// Send a frame if the connection is open; otherwise drop it.
    ///
    /// Channel registrations dropped here are recovered by replay on the next open.
    fn send<R: Serialize + ?Sized>(&mut self, frame: &R) {
        if !self.state().is_open() {
            #[cfg(feature = "tracing")]
            tracing::debug!(state = %self.state(), "Dropping outbound frame, connection not open");
            return;
        }

        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let result = serde_json::to_string(frame)
            .map_err(Error::from)
            .and_then(|text| {
                #[cfg(feature = "tracing")]
                tracing::trace!(%text, "Sending WebSocket text message");
                transport.send(text)
            });

        if let Err(e) = result {
            self.error_sink
                .report(&e, &ErrorContext::new(self.endpoint.as_str()));
        }
    }
}

impl FrameSender for Link {
    fn is_open(&self) -> bool {
        self.state().is_open() && self.has_transport()
    }

    fn send_frame(&mut self, frame: &ChannelRequest) {
        self.send(frame);
    }
}

/// Owns the transport lifecycle, the subscription registry and both timers.
///
/// Runs as a single task. Commands from client handles and events from
/// transports arrive on one queue and are handled one at a time, so every
/// transition below completes before the next event is looked at.
///
/// ```text
/// Closed --open()--> Connecting --Opened--> Open --Closed--> Closed
///    ^                                                        |
///    +------------- reconnect after `interval` ---------------+
/// ```
pub(crate) struct ConnectionManager {
    endpoint: String,
    config: Config,
    connector: Box<dyn Connector>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    link: Link,
    registry: SubscriptionRegistry,
    router: MessageRouter,
    heartbeat: HeartbeatScheduler,
    reconnect: ReconnectTimer,
    generation: u64,
    explicitly_closed: bool,
}

impl ConnectionManager {
    /// Spawn the driver task. Must be called within a tokio runtime.
    pub(crate) fn spawn(
        endpoint: String,
        config: Config,
        error_sink: ErrorSink,
        connector: Box<dyn Connector>,
    ) -> (mpsc::UnboundedSender<Event>, Observers) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);
        let (message_tx, message_rx) = watch::channel(None);
        let (handle_tx, handle_rx) = watch::channel(None);

        let router = MessageRouter::new(
            endpoint.clone(),
            config.hooks.clone(),
            error_sink.clone(),
            message_tx,
        );

        let manager = Self {
            endpoint: endpoint.clone(),
            heartbeat: HeartbeatScheduler::new(config.interval),
            config,
            connector,
            events_tx: events_tx.clone(),
            events_rx,
            link: Link {
                endpoint,
                transport: None,
                state_tx,
                handle_tx,
                error_sink,
            },
            registry: SubscriptionRegistry::new(),
            router,
            reconnect: ReconnectTimer::default(),
            generation: 0,
            explicitly_closed: false,
        };

        tokio::spawn(manager.run());

        (
            events_tx,
            Observers {
                state: state_rx,
                last_message: message_rx,
                transport: handle_rx,
            },
        )
    }

    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                biased;

                () = self.reconnect.elapsed() => Wake::Reconnect,
                () = self.heartbeat.tick() => Wake::Heartbeat,
                event = self.events_rx.recv() => Wake::Event(event),
            };

            match wake {
                Wake::Reconnect => self.on_reconnect_due(),
                Wake::Heartbeat => self.on_heartbeat(),
                Wake::Event(Some(Event::Command(command))) => self.handle_command(command),
                Wake::Event(Some(Event::Transport { generation, event })) => {
                    self.handle_transport(generation, event);
                }
                Wake::Event(Some(Event::Released)) => {
                    if self.config.auto_close {
                        self.release();
                        break;
                    }
                }
                Wake::Event(None) => break,
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open => self.open(),
            Command::Close { code, reason } => self.close(code, reason),
            Command::Send(frame) => self.send(&frame),
            Command::Subscribe { channel, callback } => {
                self.registry.subscribe(&channel, callback, &mut self.link);
            }
            Command::Unsubscribe { channel } => {
                self.registry.unsubscribe(&channel, &mut self.link);
            }
            Command::Channels(reply) => {
                _ = reply.send(self.registry.channels().map(ToOwned::to_owned).collect());
            }
        }
    }

    fn handle_transport(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation || !self.link.has_transport() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                generation,
                current = self.generation,
                ?event,
                "Ignoring event from superseded transport"
            );
            return;
        }

        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Closed(info) => self.on_close(&info),
            TransportEvent::Error(error) => self.on_error(&error),
            TransportEvent::Message(text) => self.on_message(&text),
        }
    }

    /// Explicit open: replaces any existing transport and re-arms reconnection.
    fn open(&mut self) {
        if self.link.has_transport() {
            self.close(NORMAL_CLOSURE, None);
        }
        self.explicitly_closed = false;
        self.reconnect.cancel();
        self.connect();
    }

    fn connect(&mut self) {
        self.heartbeat.stop();
        self.generation = self.generation.wrapping_add(1);

        let handle = TransportHandle::new(self.generation, self.endpoint.as_str());
        let request = ConnectRequest {
            endpoint: self.endpoint.clone(),
            protocols: self.config.protocols.clone(),
        };
        let events = TransportEvents::new(self.generation, self.events_tx.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.endpoint, generation = self.generation, "Connecting");

        let transport = self.connector.connect(request, events);
        self.link.attach(handle, transport);
        self.link.set_state(ConnectionState::Connecting);
    }

    /// Explicit close: forget every subscription and stop reconnecting.
    ///
    /// Nothing happens when there is neither a transport nor a pending reconnect.
    fn close(&mut self, code: u16, reason: Option<String>) {
        if !self.link.has_transport() && !self.reconnect.is_pending() {
            return;
        }

        self.explicitly_closed = true;
        self.registry.clear();
        self.reconnect.cancel();
        self.heartbeat.stop();
        self.link.close(code, reason);
    }

    /// Raw send path. Channel registration frames update the registry first.
    fn send(&mut self, frame: &Value) {
        if let Some((event, channel)) = control_fields(frame) {
            self.registry.track(event, channel, frame);
        }
        self.link.send(frame);
    }

    fn on_open(&mut self) {
        if self.explicitly_closed {
            // Closed while still connecting; the transport's close event follows.
            return;
        }

        self.link.set_state(ConnectionState::Open);

        if let Some(handle) = self.link.handle() {
            self.config.hooks.connected(&handle);
        }

        self.registry.replay(&mut self.link);
        self.heartbeat.start();
    }

    fn on_close(&mut self, info: &CloseInfo) {
        self.link.set_state(ConnectionState::Closed);
        let handle = self.link.detach();
        self.heartbeat.stop();

        if let Some(handle) = handle {
            self.config.hooks.disconnected(&handle, info);
        }

        if !self.explicitly_closed {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                code = info.code,
                delay = ?self.config.interval,
                "Connection dropped, scheduling reconnect"
            );
            self.reconnect.schedule(self.config.interval);
        }
    }

    fn on_error(&mut self, error: &Error) {
        self.link
            .error_sink
            .report(error, &ErrorContext::new(self.endpoint.as_str()));

        if let Some(handle) = self.link.handle() {
            self.config.hooks.error(&handle, error);
        }
    }

    fn on_message(&mut self, text: &str) {
        let Some(handle) = self.link.handle() else {
            return;
        };

        let outcome = self.router.route(text, &self.registry, &handle);

        #[cfg(feature = "tracing")]
        tracing::trace!(?outcome, "Routed inbound frame");
        #[cfg(not(feature = "tracing"))]
        let _ = outcome;
    }

    fn on_reconnect_due(&mut self) {
        self.reconnect.cancel();
        if self.explicitly_closed {
            return;
        }
        self.connect();
    }

    fn on_heartbeat(&mut self) {
        if self.link.state().is_open() {
            self.link.send(&HeartbeatFrame::now());
        }
    }

    /// Every client handle is gone: close as if the caller had, then stop.
    fn release(&mut self) {
        self.close(NORMAL_CLOSURE, None);
        self.link.detach();
        self.link.set_state(ConnectionState::Closed);
    }
}

/// Extract `(event, channel)` from a frame shaped like a channel registration.
fn control_fields(frame: &Value) -> Option<(ChannelEvent, &str)> {
    let event = frame.get("event")?.as_str()?;
    let channel = frame.get("channel")?.as_str()?;
    Some((ChannelEvent::detect(event)?, channel))
}
