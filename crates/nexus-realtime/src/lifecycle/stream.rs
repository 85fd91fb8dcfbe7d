//! Unidirectional stream lifecycle.
//!
//! One loop per stream, waiting on three things at once: a message on the
//! subscription queue, cancellation, and an idle timer. The subscription is
//! released on every exit path, including the body being dropped mid-stream.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::StreamConfig;
use crate::broker::{StreamBroker, SubscriptionGuard};

/// Comment written as soon as the stream opens.
pub const CONNECTED_FRAME: &[u8] = b": connected\n\n";

/// Comment written after each idle interval.
pub const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// Encode one payload as an event-stream `data:` frame.
pub fn data_frame(payload: &str) -> Bytes {
    Bytes::from(format!("data: {payload}\n\n"))
}

enum Step {
    Send(Bytes),
    Closed,
    Cancelled,
}

/// Subscribe to `channel` and return the event-stream body.
///
/// The subscription is registered before this returns. The stream ends when
/// the subscription queue closes or `cancel` fires; dropping it early also
/// unsubscribes.
pub fn sse_stream(
    broker: Arc<StreamBroker>,
    channel: String,
    config: StreamConfig,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let sub = broker.subscribe(&channel);
    let subscription_id = sub.id;
    let mut rx = sub.rx;
    let guard = SubscriptionGuard::new(broker, channel.clone(), subscription_id);
    info!(channel, subscription_id, "stream subscribed");

    async_stream::stream! {
        yield Ok(Bytes::from_static(CONNECTED_FRAME));

        loop {
            let step = tokio::select! {
                msg = rx.recv() => match msg {
                    Some(payload) => Step::Send(data_frame(&payload)),
                    None => Step::Closed,
                },
                () = cancel.cancelled() => Step::Cancelled,
                () = tokio::time::sleep(config.heartbeat_interval) => {
                    Step::Send(Bytes::from_static(KEEP_ALIVE_FRAME))
                }
            };
            match step {
                Step::Send(frame) => yield Ok(frame),
                Step::Closed => {
                    info!(channel, subscription_id, "stream subscription closed");
                    break;
                }
                Step::Cancelled => {
                    debug!(channel, subscription_id, "stream cancelled");
                    break;
                }
            }
        }

        drop(guard);
        info!(channel, subscription_id, "stream ended");
    }
}
