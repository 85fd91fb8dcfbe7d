//! `/healthz` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Channels with at least one WebSocket subscriber.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_channels: Option<usize>,
    /// Channels with at least one SSE subscriber.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_channels: Option<usize>,
}

/// Build a health response.
pub fn health_check(start_time: Instant) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        socket_channels: None,
        stream_channels: None,
    }
}

impl HealthResponse {
    /// Attach live registry counts.
    #[must_use]
    pub fn with_channels(mut self, socket: usize, stream: usize) -> Self {
        self.socket_channels = Some(socket);
        self.stream_channels = Some(stream);
        self
    }
}
