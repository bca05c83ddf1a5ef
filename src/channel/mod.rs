//! Channel bookkeeping: which channels are subscribed, and where inbound frames go.
//!
//! - [`SubscriptionRegistry`]: ordered channel → subscription map, replayed after reconnects
//! - [`MessageRouter`]: classifies inbound frames and dispatches them to subscribers

pub mod registry;
pub mod router;
pub mod types;

pub use registry::{Callback, FrameSender, Subscription, SubscriptionRegistry};
pub use router::{MessageRouter, RouteOutcome};
pub use types::request::{ChannelEvent, ChannelRequest, ControlFrame, HeartbeatFrame};
pub use types::response::InboundMessage;
