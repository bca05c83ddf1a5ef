//! Core WebSocket infrastructure.
//!
//! This module owns the connection lifecycle that every subscription rides on.
//!
//! # Architecture
//!
//! - [`connection`]: single driver task holding the state machine, the subscription
//!   registry, the heartbeat and the reconnect timer
//! - [`Connector`] / [`Transport`]: the socket seam, implemented for real sockets by
//!   [`TungsteniteConnector`]
//! - [`Hooks`] / [`ErrorSink`]: caller-supplied callbacks
//!
//! Callers normally go through [`crate::Client`]; a custom [`Connector`] can be
//! supplied with [`crate::Client::with_connector`].

pub mod config;
pub mod connection;
pub mod error;
pub(crate) mod heartbeat;
pub mod hooks;
pub mod traits;
pub mod transport;

pub use connection::{ConnectionState, TransportHandle};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use hooks::{ErrorSink, Hooks};
pub use traits::*;
pub use transport::TungsteniteConnector;
