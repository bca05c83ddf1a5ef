use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::Result;
use crate::channel::registry::Callback;
use crate::channel::types::response::InboundMessage;
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::connection::{
    Command, ConnectionManager, ConnectionState, Event, Observers, TransportHandle,
};
use crate::ws::hooks::ErrorSink;
use crate::ws::traits::{Connector, NORMAL_CLOSURE};
use crate::ws::transport::TungsteniteConnector;
use crate::ws::WsError;

/// Reconnecting channel client.
///
/// One client owns one logical connection. Subscriptions made through it
/// survive transport drops and are replayed on every reconnect. Cloning the
/// client is cheap and every clone drives the same connection.
///
/// # Examples
///
/// ```rust, no_run
/// use std::time::Duration;
///
/// use channel_socket::Client;
/// use channel_socket::ws::config::Config;
/// use channel_socket::ws::hooks::ErrorSink;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::new("wss://stream.example.com/ws", Config::default(), ErrorSink::default())?;
///
///     client.subscribe("ticker.BTC", |update| {
///         println!("BTC: {:?}", update.data);
///     })?;
///
///     tokio::time::sleep(Duration::from_secs(60)).await;
///     client.close()?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Endpoint every transport connects to
    endpoint: String,
    /// Queue into the connection driver
    events_tx: mpsc::UnboundedSender<Event>,
    /// Current [`ConnectionState`]
    state: watch::Receiver<ConnectionState>,
    /// Most recent non-heartbeat frame
    last_message: watch::Receiver<Option<InboundMessage>>,
    /// Live transport, if any
    transport: watch::Receiver<Option<TransportHandle>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        _ = self.events_tx.send(Event::Released);
    }
}

impl Client {
    /// Create a client over real WebSocket connections.
    ///
    /// Must be called within a tokio runtime. Connects right away unless
    /// [`Config::immediate`] is `false`.
    pub fn new(endpoint: &str, config: Config, error_sink: ErrorSink) -> Result<Self> {
        Self::with_connector(endpoint, config, error_sink, TungsteniteConnector)
    }

    /// Create a client whose transports come from `connector`.
    pub fn with_connector<C: Connector>(
        endpoint: &str,
        config: Config,
        error_sink: ErrorSink,
        connector: C,
    ) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::validation(format!(
                "endpoint must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }
        if config.interval.is_zero() {
            return Err(Error::validation("interval must be non-zero"));
        }

        let immediate = config.immediate;
        let (events_tx, observers) = ConnectionManager::spawn(
            endpoint.to_owned(),
            config,
            error_sink,
            Box::new(connector),
        );
        let Observers {
            state,
            last_message,
            transport,
        } = observers;

        let client = Self {
            inner: Arc::new(ClientInner {
                endpoint: endpoint.to_owned(),
                events_tx,
                state,
                last_message,
                transport,
            }),
        };

        if immediate {
            client.open()?;
        }

        Ok(client)
    }

    fn command(&self, command: Command) -> Result<()> {
        self.inner
            .events_tx
            .send(Event::Command(command))
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// (Re)connect. An existing transport is closed first, which also forgets
    /// every subscription, exactly like [`Client::close`].
    pub fn open(&self) -> Result<()> {
        self.command(Command::Open)
    }

    /// Close with code 1000. Subscriptions are forgotten and no reconnect follows.
    pub fn close(&self) -> Result<()> {
        self.close_with(NORMAL_CLOSURE, None)
    }

    /// Close with a custom code and reason.
    pub fn close_with(&self, code: u16, reason: Option<String>) -> Result<()> {
        self.command(Command::Close { code, reason })
    }

    /// Send an arbitrary frame.
    ///
    /// Frames shaped like `{"event":"addChannel","channel":..}` register the
    /// channel (without a callback) and `removeChannel` frames unregister it.
    /// Frames are only transmitted while the connection is open.
    pub fn send<R: Serialize>(&self, frame: &R) -> Result<()> {
        let frame = serde_json::to_value(frame)?;
        self.command(Command::Send(frame))
    }

    /// Subscribe to `channel`, invoking `callback` with every successful update.
    ///
    /// Does nothing if the channel is already subscribed.
    pub fn subscribe<F>(&self, channel: &str, callback: F) -> Result<()>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        self.command(Command::Subscribe {
            channel: channel.to_owned(),
            callback: Some(callback),
        })
    }

    /// Subscribe to `channel` and receive its successful updates as a stream.
    ///
    /// The stream ends once the subscription is removed by
    /// [`Client::unsubscribe`] or [`Client::close`]. If the channel is already
    /// subscribed the existing subscription is kept and this stream ends
    /// immediately.
    pub fn subscribe_stream(&self, channel: &str) -> Result<impl Stream<Item = InboundMessage>> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.subscribe(channel, move |update| {
            _ = tx.send(update.clone());
        })?;

        Ok(stream! {
            while let Some(update) = rx.recv().await {
                yield update;
            }
        })
    }

    /// Unsubscribe from `channel`. Unknown channels are ignored.
    pub fn unsubscribe(&self, channel: &str) -> Result<()> {
        self.command(Command::Unsubscribe {
            channel: channel.to_owned(),
        })
    }

    /// Registered channels in the order they will be replayed.
    pub async fn channels(&self) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Channels(tx))?;
        rx.await.map_err(|_e| Error::from(WsError::ConnectionClosed))
    }

    /// Get the current connection state.
    #[must_use]
    pub fn status(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// The last frame received that was not a heartbeat acknowledgement.
    #[must_use]
    pub fn last_message(&self) -> Option<InboundMessage> {
        self.inner.last_message.borrow().clone()
    }

    #[must_use]
    pub fn last_message_receiver(&self) -> watch::Receiver<Option<InboundMessage>> {
        self.inner.last_message.clone()
    }

    /// The live transport, `None` between a close and the next (re)connect.
    #[must_use]
    pub fn transport(&self) -> Option<TransportHandle> {
        self.inner.transport.borrow().clone()
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }
}
