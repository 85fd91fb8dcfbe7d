//! Registry of unidirectional-transport subscriptions.
//!
//! Each subscription is an anonymous bounded queue bound to one channel for
//! its whole life. The broker holds the only sender, so unsubscribing closes
//! the queue and the consumer sees end-of-stream once it drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::DEFAULT_STREAM_QUEUE_CAPACITY;
use crate::broadcaster::PublishTarget;

struct StreamSender {
    tx: mpsc::Sender<Arc<str>>,
    dropped_messages: AtomicU64,
}

/// The consuming side of one subscription.
pub struct StreamSubscription {
    /// Handle ID, unique within the broker.
    pub id: u64,
    /// The channel this subscription is scoped to.
    pub channel: String,
    /// Incoming payloads. Yields `None` after unsubscription.
    pub rx: mpsc::Receiver<Arc<str>>,
}

/// Channel → subscriptions registry for the unidirectional transport.
pub struct StreamBroker {
    channels: RwLock<HashMap<String, HashMap<u64, StreamSender>>>,
    next_id: AtomicU64,
    dropped_total: AtomicU64,
    queue_capacity: usize,
}

impl StreamBroker {
    /// Create a broker whose subscriptions hold `queue_capacity` messages.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dropped_total: AtomicU64::new(0),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Open a subscription on `channel`.
    pub fn subscribe(&self, channel: &str) -> StreamSubscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .channels
            .write()
            .entry(channel.to_string())
            .or_default()
            .insert(
                id,
                StreamSender {
                    tx,
                    dropped_messages: AtomicU64::new(0),
                },
            );
        StreamSubscription {
            id,
            channel: channel.to_string(),
            rx,
        }
    }

    /// Remove subscription `id` from `channel` and close its queue.
    ///
    /// Returns `false` if it was not registered. Drops the channel entry when
    /// it empties.
    pub fn unsubscribe(&self, channel: &str, id: u64) -> bool {
        let mut channels = self.channels.write();
        let Some(subs) = channels.get_mut(channel) else {
            return false;
        };
        let removed = subs.remove(&id);
        if subs.is_empty() {
            let _ = channels.remove(channel);
        }
        match removed {
            Some(sender) => {
                let dropped_messages = sender.dropped_messages.load(Ordering::Relaxed);
                if dropped_messages > 0 {
                    debug!(channel, subscription_id = id, dropped_messages, "subscription closed with drops");
                }
                true
            }
            None => false,
        }
    }

    /// Deliver `payload` to every subscription on `channel` without waiting.
    ///
    /// Returns how many subscriptions accepted it.
    pub fn publish(&self, channel: &str, payload: Arc<str>) -> usize {
        let channels = self.channels.read();
        let Some(subs) = channels.get(channel) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, sub) in subs {
            if sub.tx.try_send(Arc::clone(&payload)).is_ok() {
                delivered += 1;
            } else {
                let dropped_messages = sub.dropped_messages.fetch_add(1, Ordering::Relaxed) + 1;
                let _ = self.dropped_total.fetch_add(1, Ordering::Relaxed);
                debug!(
                    channel,
                    subscription_id = *id,
                    dropped_messages,
                    "subscription queue full, message dropped"
                );
            }
        }
        delivered
    }

    /// Number of channels with at least one subscription.
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Number of subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.read().get(channel).map_or(0, HashMap::len)
    }

    /// Messages dropped across all subscriptions since startup.
    pub fn drop_count(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

impl Default for StreamBroker {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_QUEUE_CAPACITY)
    }
}

impl PublishTarget for StreamBroker {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn publish(&self, channel: &str, payload: Arc<str>) -> usize {
        StreamBroker::publish(self, channel, payload)
    }
}

/// Unsubscribes when dropped.
///
/// Tie this to the lifetime of whatever consumes a [`StreamSubscription`] so
/// every exit path releases the registry entry.
pub struct SubscriptionGuard {
    broker: Arc<StreamBroker>,
    channel: String,
    id: u64,
}

impl SubscriptionGuard {
    /// Guard subscription `id` on `channel`.
    pub fn new(broker: Arc<StreamBroker>, channel: String, id: u64) -> Self {
        Self { broker, channel, id }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let _ = self.broker.unsubscribe(&self.channel, self.id);
    }
}
