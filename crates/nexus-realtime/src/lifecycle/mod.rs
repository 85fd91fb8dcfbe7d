//! Per-connection state machines.
//!
//! Both lifecycles are written against plain `futures` traits rather than a
//! web framework, so the server adapts its socket and body types to them and
//! tests drive them with in-memory channels.

mod socket;
mod stream;

use std::time::Duration;

pub use socket::{ControlOutcome, SocketFrame, apply_control, run_socket_session};
pub use stream::{CONNECTED_FRAME, KEEP_ALIVE_FRAME, data_frame, sse_stream};

/// Acceptor settings for bidirectional connections.
#[derive(Clone, Debug)]
pub struct SocketConfig {
    /// Interval between server Ping frames. `None` disables pings.
    pub ping_interval: Option<Duration>,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            ping_interval: Some(Duration::from_secs(30)),
            max_message_size: 64 * 1024,
        }
    }
}

/// Acceptor settings for unidirectional streams.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Idle time after which a keep-alive comment is written.
    pub heartbeat_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}
