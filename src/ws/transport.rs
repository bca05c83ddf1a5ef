//! [`Connector`] backed by `tokio-tungstenite`.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, client::IntoClientRequest as _};

use super::error::WsError;
use super::traits::{
    CloseInfo, ConnectRequest, Connector, NO_STATUS_RECEIVED, NORMAL_CLOSURE, Transport,
    TransportEvents,
};
use crate::Result;

/// How long to wait for the peer to answer our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A close handshake we started. The deadline is fixed when the close frame goes out.
struct Closing {
    info: CloseInfo,
    deadline: Pin<Box<Sleep>>,
}

impl Closing {
    fn start(info: CloseInfo) -> Self {
        Self {
            info,
            deadline: Box::pin(sleep(CLOSE_HANDSHAKE_TIMEOUT)),
        }
    }
}

/// Resolves when the pending close handshake times out; never while none is pending.
async fn handshake_expired(closing: &mut Option<Closing>) {
    match closing {
        Some(closing) => closing.deadline.as_mut().await,
        None => pending::<()>().await,
    }
}

/// Opens real WebSocket connections. Each transport runs in its own task.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect(&self, request: ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            run_transport(request, outgoing_rx, events).await;
        });

        Box::new(TungsteniteTransport { outgoing_tx })
    }
}

enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

struct TungsteniteTransport {
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
}

impl Transport for TungsteniteTransport {
    fn send(&mut self, text: String) -> Result<()> {
        self.outgoing_tx
            .send(Outgoing::Text(text))
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    fn close(&mut self, code: u16, reason: Option<String>) {
        _ = self.outgoing_tx.send(Outgoing::Close {
            code,
            reason: reason.unwrap_or_default(),
        });
    }
}

fn client_request(request: &ConnectRequest) -> Result<Request> {
    let mut client_request = request.endpoint.as_str().into_client_request()?;

    if !request.protocols.is_empty() {
        let value = HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| WsError::InvalidRequest(e.to_string()))?;
        client_request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(client_request)
}

/// Connect, then pump frames both ways until either side closes.
///
/// A failed connection attempt reports an error followed by an abnormal close,
/// so the driver's reconnect policy applies uniformly.
async fn run_transport(
    request: ConnectRequest,
    mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    events: TransportEvents,
) {
    let connected: Result<_> = match client_request(&request) {
        Ok(client_request) => connect_async(client_request).await.map_err(Into::into),
        Err(e) => Err(e),
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(endpoint = %request.endpoint, error = %e, "Unable to connect");
            events.error(e);
            events.closed(CloseInfo::abnormal());
            return;
        }
    };

    events.opened();

    let (mut write, mut read) = ws_stream.split();
    let mut closing: Option<Closing> = None;

    let info = loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%text, "Received WebSocket text message");
                        events.message(text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break closing.take().map(|c| c.info).unwrap_or_else(|| {
                            frame.map_or_else(
                                || CloseInfo::new(NO_STATUS_RECEIVED, "", true),
                                |f| CloseInfo::new(u16::from(f.code), f.reason.as_str().to_owned(), true),
                            )
                        });
                    }
                    Some(Ok(_)) => {
                        // Binary frames are not part of the protocol; ping/pong is handled by tungstenite.
                    }
                    Some(Err(e)) => {
                        if let Some(closing) = closing.take() {
                            break closing.info;
                        }
                        events.error(e.into());
                        break CloseInfo::abnormal();
                    }
                    None => break closing.take().map_or_else(CloseInfo::abnormal, |c| c.info),
                }
            }

            outgoing = outgoing_rx.recv(), if closing.is_none() => {
                match outgoing {
                    Some(Outgoing::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            events.error(e.into());
                            break CloseInfo::abnormal();
                        }
                    }
                    Some(Outgoing::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.clone().into(),
                        };
                        _ = write.send(Message::Close(Some(frame))).await;
                        closing = Some(Closing::start(CloseInfo::new(code, reason, true)));
                    }
                    None => {
                        // Transport handle dropped without an explicit close.
                        _ = write.send(Message::Close(None)).await;
                        closing = Some(Closing::start(CloseInfo::new(NORMAL_CLOSURE, "", true)));
                    }
                }
            }

            () = handshake_expired(&mut closing), if closing.is_some() => {
                let mut info = closing.take().map_or_else(CloseInfo::abnormal, |c| c.info);
                info.was_clean = false;
                break info;
            }
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(code = info.code, reason = %info.reason, "WebSocket transport closed");

    events.closed(info);
}
