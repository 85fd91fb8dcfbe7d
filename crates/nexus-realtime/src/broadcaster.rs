//! Fan-out of envelopes to the subscriber registries.

use std::sync::Arc;

use async_trait::async_trait;
use nexus_core::{EventEnvelope, GatewayError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broker::StreamBroker;
use crate::hub::ChannelHub;

/// A registry that accepts serialized payloads for a channel.
///
/// Implementations must not block: a subscriber that cannot take the
/// payload right now misses it.
pub trait PublishTarget: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Deliver to every subscriber of `channel`; returns how many accepted.
    fn publish(&self, channel: &str, payload: Arc<str>) -> usize;
}

/// The frame written to subscribers: `{"channel": ..., "event": ...}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireFrame<E = EventEnvelope> {
    /// Channel the event was published on.
    pub channel: String,
    /// The envelope.
    pub event: E,
}

/// Publishes an envelope on a resolved channel.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Serialize `{channel, event}` and hand it to every registry.
    ///
    /// Only serialization failure is an error. Success means accepted for
    /// best-effort delivery, not delivered.
    async fn broadcast_event(
        &self,
        channel: &str,
        event: &EventEnvelope,
    ) -> Result<(), GatewayError>;
}

/// [`Broadcaster`] over a fixed set of registries.
#[derive(Clone)]
pub struct FanoutBroadcaster {
    targets: Vec<Arc<dyn PublishTarget>>,
}

impl FanoutBroadcaster {
    /// Publish to both transports.
    pub fn new(hub: Arc<ChannelHub>, broker: Arc<StreamBroker>) -> Self {
        Self::with_targets(vec![hub as Arc<dyn PublishTarget>, broker])
    }

    /// Publish to an arbitrary set of registries.
    pub fn with_targets(targets: Vec<Arc<dyn PublishTarget>>) -> Self {
        Self { targets }
    }
}

/// Serialize the wire frame for `event` on `channel`.
pub fn encode_frame(channel: &str, event: &EventEnvelope) -> Result<Arc<str>, GatewayError> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        channel: &'a str,
        event: &'a EventEnvelope,
    }
    let json = serde_json::to_string(&Borrowed { channel, event })?;
    Ok(Arc::from(json))
}

#[async_trait]
impl Broadcaster for FanoutBroadcaster {
    async fn broadcast_event(
        &self,
        channel: &str,
        event: &EventEnvelope,
    ) -> Result<(), GatewayError> {
        let payload = encode_frame(channel, event)?;
        for target in &self.targets {
            let delivered = target.publish(channel, Arc::clone(&payload));
            debug!(
                event_id = %event.id,
                channel,
                target = target.name(),
                delivered,
                "broadcast event"
            );
        }
        Ok(())
    }
}
