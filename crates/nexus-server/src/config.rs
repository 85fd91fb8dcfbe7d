//! Server configuration.

use std::time::Duration;

use nexus_realtime::{
    DEFAULT_HUB_QUEUE_CAPACITY, DEFAULT_STREAM_QUEUE_CAPACITY, SocketConfig, StreamConfig,
};
use nexus_settings::GatewaySettings;

/// Everything the two listeners need, resolved from settings.
///
/// [`Default`] binds loopback on ephemeral ports, which suits tests and
/// embedding. A deployed gateway builds its config from [`GatewaySettings`],
/// whose defaults are `0.0.0.0`, port 8080, and port 8081.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Host to bind.
    pub host: String,
    /// Gateway port. `0` lets the OS pick one.
    pub gateway_port: u16,
    /// Control-plane port. `0` lets the OS pick one.
    pub control_port: u16,
    /// Upper bound on draining connections at shutdown.
    pub shutdown_timeout: Duration,
    /// Outbound queue capacity per WebSocket client.
    pub hub_queue_capacity: usize,
    /// Queue capacity per SSE subscription.
    pub stream_queue_capacity: usize,
    /// WebSocket acceptor settings.
    pub socket: SocketConfig,
    /// SSE acceptor settings.
    pub stream: StreamConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            gateway_port: 0,
            control_port: 0,
            shutdown_timeout: Duration::from_secs(10),
            hub_queue_capacity: DEFAULT_HUB_QUEUE_CAPACITY,
            stream_queue_capacity: DEFAULT_STREAM_QUEUE_CAPACITY,
            socket: SocketConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl From<&GatewaySettings> for GatewayConfig {
    fn from(settings: &GatewaySettings) -> Self {
        let rt = &settings.realtime;
        let ping_interval =
            (rt.ws_ping_interval_secs > 0).then(|| Duration::from_secs(rt.ws_ping_interval_secs));
        Self {
            host: settings.server.host.clone(),
            gateway_port: settings.server.gateway_port,
            control_port: settings.server.control_port,
            shutdown_timeout: Duration::from_secs(settings.server.shutdown_timeout_secs),
            hub_queue_capacity: rt.hub_queue_capacity,
            stream_queue_capacity: rt.stream_queue_capacity,
            socket: SocketConfig {
                ping_interval,
                max_message_size: rt.ws_max_message_size,
            },
            stream: StreamConfig {
                heartbeat_interval: Duration::from_secs(rt.stream_heartbeat_secs),
            },
        }
    }
}

impl GatewayConfig {
    /// `host:gateway_port`.
    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.host, self.gateway_port)
    }

    /// `host:control_port`.
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }
}
