#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;

use super::hooks::Hooks;

const DEFAULT_INTERVAL_DURATION: Duration = Duration::from_secs(30);

/// Configuration for [`crate::Client`] behavior.
///
/// ```
/// use std::time::Duration;
///
/// use channel_socket::ws::config::Config;
///
/// let config = Config::builder()
///     .interval(Duration::from_secs(10))
///     .immediate(false)
///     .build();
/// assert!(config.auto_close);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Period between heartbeats, and the delay before reconnecting after an
    /// unexpected drop. Reconnection is retried at this fixed interval forever.
    #[builder(default = DEFAULT_INTERVAL_DURATION)]
    pub interval: Duration,
    /// Open the connection as soon as the client is constructed
    #[builder(default = true)]
    pub immediate: bool,
    /// Close the connection once the last client handle is dropped
    #[builder(default = true)]
    pub auto_close: bool,
    /// Sub-protocols offered in the `Sec-WebSocket-Protocol` header
    #[builder(default, into)]
    pub protocols: Vec<String>,
    /// Lifecycle callbacks
    #[builder(default)]
    pub hooks: Hooks,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}
