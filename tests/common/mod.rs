#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every test binary uses every helper"
)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use channel_socket::Client;
use channel_socket::channel::InboundMessage;
use channel_socket::error::{ChannelError, Error, ErrorContext, Kind};
use channel_socket::ws::config::Config;
use channel_socket::ws::hooks::ErrorSink;
use channel_socket::ws::{CloseInfo, ConnectRequest, Connector, Transport, TransportEvents};
use serde_json::Value;

pub const ENDPOINT: &str = "wss://stream.example.com/ws";
pub const INTERVAL: Duration = Duration::from_secs(1);

/// Everything a [`MockTransport`] was asked to do.
#[derive(Default)]
struct Record {
    sent: Vec<String>,
    closed: Option<(u16, Option<String>)>,
}

/// One connection attempt made through [`MockConnector`].
#[derive(Clone)]
pub struct MockConnection {
    pub request: ConnectRequest,
    pub events: TransportEvents,
    record: Arc<Mutex<Record>>,
}

impl MockConnection {
    /// Frames the client transmitted, decoded.
    #[must_use]
    pub fn sent(&self) -> Vec<Value> {
        self.record
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Frames the client transmitted, excluding heartbeats.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|frame| frame.get("ping").is_none())
            .collect()
    }

    /// Heartbeat frames the client transmitted.
    #[must_use]
    pub fn heartbeats(&self) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|frame| frame.get("ping").is_some())
            .collect()
    }

    /// Close requested by the client, if any.
    #[must_use]
    pub fn closed(&self) -> Option<(u16, Option<String>)> {
        self.record.lock().unwrap().closed.clone()
    }
}

struct MockTransport {
    events: TransportEvents,
    record: Arc<Mutex<Record>>,
}

impl Transport for MockTransport {
    fn send(&mut self, text: String) -> channel_socket::Result<()> {
        self.record.lock().unwrap().sent.push(text);
        Ok(())
    }

    fn close(&mut self, code: u16, reason: Option<String>) {
        self.record.lock().unwrap().closed = Some((code, reason.clone()));
        self.events
            .closed(CloseInfo::new(code, reason.unwrap_or_default(), true));
    }
}

/// Connector whose transports never touch the network.
///
/// Tests drive each connection by emitting events on [`MockConnection::events`].
#[derive(Clone, Default)]
pub struct MockConnector {
    connections: Arc<Mutex<Vec<MockConnection>>>,
}

impl MockConnector {
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    #[must_use]
    pub fn connection(&self, index: usize) -> MockConnection {
        self.connections.lock().unwrap()[index].clone()
    }

    #[must_use]
    pub fn latest(&self) -> MockConnection {
        self.connections.lock().unwrap().last().cloned().unwrap()
    }
}

impl Connector for MockConnector {
    fn connect(&self, request: ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
        let record = Arc::new(Mutex::new(Record::default()));
        self.connections.lock().unwrap().push(MockConnection {
            request,
            events: events.clone(),
            record: Arc::clone(&record),
        });
        Box::new(MockTransport { events, record })
    }
}

/// One call to the error sink.
#[derive(Debug, Clone)]
pub struct ReportedError {
    pub kind: Kind,
    pub url: String,
    pub frame: Option<InboundMessage>,
}

/// Error sink that remembers what it was given.
#[derive(Clone, Default)]
pub struct ErrorLog {
    reported: Arc<Mutex<Vec<ReportedError>>>,
}

impl ErrorLog {
    #[must_use]
    pub fn sink(&self) -> ErrorSink {
        let reported = Arc::clone(&self.reported);
        ErrorSink::new(move |error: &Error, context: &ErrorContext| {
            reported.lock().unwrap().push(ReportedError {
                kind: error.kind(),
                url: context.url.clone(),
                frame: error.downcast_ref::<ChannelError>().map(|e| e.frame.clone()),
            });
        })
    }

    #[must_use]
    pub fn reported(&self) -> Vec<ReportedError> {
        self.reported.lock().unwrap().clone()
    }
}

#[must_use]
pub fn config() -> Config {
    Config::builder().interval(INTERVAL).build()
}

/// Wait until the driver has handled everything queued before this call, plus
/// the events those handlers queued in turn (e.g. the close a mock transport
/// reports right after being asked to close).
pub async fn settle(client: &Client) {
    client.channels().await.unwrap();
    client.channels().await.unwrap();
}

/// Build a client over `connector`, open its first transport and wait for `OPEN`.
pub async fn open_client(connector: &MockConnector, errors: &ErrorLog) -> Client {
    let client =
        Client::with_connector(ENDPOINT, config(), errors.sink(), connector.clone()).unwrap();
    settle(&client).await;
    connector.latest().events.opened();
    settle(&client).await;
    client
}
