//! # nexus-realtime
//!
//! Live delivery of events to connected subscribers.
//!
//! - [`ChannelHub`]: registry of bidirectional (WebSocket) clients, each
//!   joined to any number of channels
//! - [`StreamBroker`]: registry of unidirectional (SSE) subscriptions, each
//!   scoped to one channel
//! - [`Broadcaster`]: serializes an envelope once and publishes it to every
//!   registry
//! - [`lifecycle`]: per-connection loops for both transports, independent of
//!   the HTTP framework
//!
//! Publishing never blocks: every subscriber owns a bounded queue and a full
//! queue drops the message for that subscriber only.

#![deny(unsafe_code)]

pub mod broadcaster;
pub mod broker;
pub mod hub;
pub mod lifecycle;

pub use broadcaster::{Broadcaster, FanoutBroadcaster, PublishTarget, WireFrame};
pub use broker::{StreamBroker, StreamSubscription, SubscriptionGuard};
pub use hub::{ChannelHub, HubClient};
pub use lifecycle::{SocketConfig, SocketFrame, StreamConfig, run_socket_session, sse_stream};

/// Outbound queue capacity of a WebSocket client.
pub const DEFAULT_HUB_QUEUE_CAPACITY: usize = 32;

/// Queue capacity of an SSE subscription.
pub const DEFAULT_STREAM_QUEUE_CAPACITY: usize = 16;
