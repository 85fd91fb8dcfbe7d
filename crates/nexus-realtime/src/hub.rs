//! Registry of bidirectional-transport clients.
//!
//! A [`HubClient`] owns one bounded outbound queue and may be joined to many
//! channels; a channel holds many clients. The registry map is guarded by a
//! single reader/writer lock: publishes share it, membership changes take it
//! exclusively. Lock order is registry, then client membership set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use nexus_core::ids::ClientId;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::DEFAULT_HUB_QUEUE_CAPACITY;
use crate::broadcaster::PublishTarget;

/// One connected bidirectional client.
pub struct HubClient {
    /// Unique client ID.
    pub id: ClientId,
    /// Send side of the client's outbound queue.
    tx: mpsc::Sender<Arc<str>>,
    /// Channels this client is currently registered under.
    channels: Mutex<HashSet<String>>,
    /// When this client connected.
    connected_at: Instant,
    /// Count of messages dropped due to a full or closed queue.
    dropped_messages: AtomicU64,
}

impl HubClient {
    /// Create a client with an outbound queue of `capacity` messages.
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let client = Arc::new(Self {
            id: ClientId::new(),
            tx,
            channels: Mutex::new(HashSet::new()),
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        });
        (client, rx)
    }

    /// Enqueue without waiting.
    ///
    /// Returns `false` and counts a drop if the queue is full or closed.
    pub fn send(&self, message: Arc<str>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this client.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Channels the client is joined to, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut out: Vec<String> = self.channels.lock().iter().cloned().collect();
        out.sort();
        out
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

type Members = HashMap<ClientId, Arc<HubClient>>;

/// Channel → clients registry for the bidirectional transport.
pub struct ChannelHub {
    channels: RwLock<HashMap<String, Members>>,
    queue_capacity: usize,
}

impl ChannelHub {
    /// Create a hub whose clients get queues of `queue_capacity` messages.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Create a client sized for this hub. The client joins no channel yet.
    pub fn connect(&self) -> (Arc<HubClient>, mpsc::Receiver<Arc<str>>) {
        HubClient::new(self.queue_capacity)
    }

    /// Add `client` to `channel`, creating the channel entry if absent.
    /// Registering twice is a no-op.
    pub fn register(&self, channel: &str, client: &Arc<HubClient>) {
        let mut channels = self.channels.write();
        let _ = channels
            .entry(channel.to_string())
            .or_default()
            .insert(client.id.clone(), Arc::clone(client));
        let _ = client.channels.lock().insert(channel.to_string());
    }

    /// Remove `client` from `channel`. Drops the channel entry when it
    /// empties. Unknown channel or client is a no-op.
    pub fn unregister(&self, channel: &str, client: &HubClient) {
        let mut channels = self.channels.write();
        remove_member(&mut channels, channel, &client.id);
        let _ = client.channels.lock().remove(channel);
    }

    /// Remove `client` from every channel it joined.
    pub fn unregister_all(&self, client: &HubClient) {
        let mut channels = self.channels.write();
        let joined: Vec<String> = client.channels.lock().drain().collect();
        for channel in &joined {
            remove_member(&mut channels, channel, &client.id);
        }
    }

    /// Deliver `payload` to every client on `channel` without waiting.
    ///
    /// Returns how many clients accepted it. Clients with a full queue miss
    /// the message.
    pub fn publish(&self, channel: &str, payload: Arc<str>) -> usize {
        let channels = self.channels.read();
        let Some(members) = channels.get(channel) else {
            return 0;
        };
        let mut delivered = 0;
        for client in members.values() {
            if client.send(Arc::clone(&payload)) {
                delivered += 1;
            } else {
                debug!(
                    client_id = %client.id,
                    channel,
                    dropped_messages = client.drop_count(),
                    "client queue full, message dropped"
                );
            }
        }
        delivered
    }

    /// Number of channels with at least one client.
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Number of clients on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.read().get(channel).map_or(0, HashMap::len)
    }

    /// Whether `channel` has an entry.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.read().contains_key(channel)
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_QUEUE_CAPACITY)
    }
}

impl PublishTarget for ChannelHub {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn publish(&self, channel: &str, payload: Arc<str>) -> usize {
        ChannelHub::publish(self, channel, payload)
    }
}

fn remove_member(channels: &mut HashMap<String, Members>, channel: &str, id: &ClientId) {
    if let Some(members) = channels.get_mut(channel) {
        let _ = members.remove(id);
        if members.is_empty() {
            let _ = channels.remove(channel);
        }
    }
}
