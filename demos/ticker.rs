//! Stream ticker updates from a channel-multiplexed WebSocket feed.
//!
//! This example:
//! 1. Connects and logs every connection state change
//! 2. Subscribes to two ticker channels, one with a callback and one as a stream
//! 3. Unsubscribes and closes after a handful of updates
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info cargo run --example ticker --features tracing -- wss://stream.example.com/ws
//! ```

use std::time::Duration;

use channel_socket::Client;
use channel_socket::ws::config::Config;
use channel_socket::ws::hooks::{ErrorSink, Hooks};
use futures::StreamExt as _;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wss://stream.example.com/ws".to_owned());

    let hooks = Hooks::default()
        .on_connected(|handle| info!(generation = handle.generation, "Connected"))
        .on_disconnected(|handle, close| {
            info!(generation = handle.generation, code = close.code, reason = %close.reason, "Disconnected");
        });
    let config = Config::builder()
        .interval(Duration::from_secs(10))
        .hooks(hooks)
        .build();
    let errors = ErrorSink::new(|error, context| warn!(url = %context.url, %error));

    let client = Client::new(&endpoint, config, errors)?;

    let mut status = client.status_receiver();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let state = *status.borrow_and_update();
            debug!(%state, "Connection state");
        }
    });

    client.subscribe("ticker.ETH", |update| {
        info!(channel = "ticker.ETH", data = ?update.data);
    })?;

    let stream = client.subscribe_stream("ticker.BTC")?;
    let mut stream = Box::pin(stream);
    let mut count = 0;

    while let Ok(Some(update)) = timeout(Duration::from_secs(30), stream.next()).await {
        info!(channel = "ticker.BTC", data = ?update.data);
        count += 1;
        if count >= 10 {
            break;
        }
    }
    info!(channel = "ticker.BTC", received = count);

    client.unsubscribe("ticker.ETH")?;
    info!(channels = ?client.channels().await?, "Remaining subscriptions");

    client.close()?;
    Ok(())
}
