//! Bidirectional client lifecycle.
//!
//! Connected → Subscribed(n) → Disconnected. Two loops run per connection:
//! inbound applies `{action, channel}` control messages to the hub, outbound
//! drains the client's queue to the socket and sends pings. Whichever loop
//! exits first stops the other, and teardown removes the client from every
//! channel it joined.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use nexus_core::ids::TenantId;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::SocketConfig;
use crate::hub::{ChannelHub, HubClient};

/// A socket frame, independent of the WebSocket library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes. Treated as text when they are valid UTF-8.
    Binary(Bytes),
    /// Ping with payload.
    Ping(Bytes),
    /// Pong with payload.
    Pong(Bytes),
    /// Peer is closing.
    Close,
}

#[derive(Debug, Deserialize)]
struct ControlMessage {
    action: String,
    #[serde(default)]
    channel: String,
}

/// What a control message did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Client joined the channel.
    Subscribed(String),
    /// Client left the channel.
    Unsubscribed(String),
    /// Payload was not a control message, or named no channel.
    Malformed,
    /// Action other than `subscribe` / `unsubscribe`.
    UnknownAction(String),
}

/// Parse one control message and apply it to the hub.
///
/// Malformed payloads and unknown actions are logged and otherwise ignored.
pub fn apply_control(hub: &ChannelHub, client: &Arc<HubClient>, text: &str) -> ControlOutcome {
    let msg: ControlMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "invalid control message");
            return ControlOutcome::Malformed;
        }
    };
    match msg.action.as_str() {
        "subscribe" | "unsubscribe" if msg.channel.is_empty() => {
            warn!(action = %msg.action, "control message without channel");
            ControlOutcome::Malformed
        }
        "subscribe" => {
            hub.register(&msg.channel, client);
            info!(channel = %msg.channel, "subscribed");
            ControlOutcome::Subscribed(msg.channel)
        }
        "unsubscribe" => {
            hub.unregister(&msg.channel, client);
            info!(channel = %msg.channel, "unsubscribed");
            ControlOutcome::Unsubscribed(msg.channel)
        }
        _ => {
            warn!(action = %msg.action, "unknown control action");
            ControlOutcome::UnknownAction(msg.action)
        }
    }
}

/// Run a bidirectional session until either side fails or closes.
///
/// `reader` yields inbound frames; `writer` accepts outbound ones. Returns
/// after the client has been removed from every channel.
#[instrument(skip_all, fields(tenant_id = %tenant_id, client_id = tracing::field::Empty))]
pub async fn run_socket_session<R, W, E>(
    reader: R,
    writer: W,
    hub: Arc<ChannelHub>,
    tenant_id: TenantId,
    config: SocketConfig,
) where
    R: Stream<Item = Result<SocketFrame, E>> + Unpin,
    W: Sink<SocketFrame> + Unpin,
    W::Error: fmt::Display,
    E: fmt::Display,
{
    let (client, rx) = hub.connect();
    let _ = tracing::Span::current().record("client_id", tracing::field::display(&client.id));
    info!("client connected");

    let done = CancellationToken::new();
    let inbound = async {
        run_inbound(reader, &hub, &client, &done).await;
        done.cancel();
    };
    let outbound = async {
        run_outbound(writer, rx, config.ping_interval, &done).await;
        done.cancel();
    };
    let ((), ()) = tokio::join!(inbound, outbound);

    hub.unregister_all(&client);
    info!(
        dropped_messages = client.drop_count(),
        duration_ms = u64::try_from(client.age().as_millis()).unwrap_or(u64::MAX),
        "client disconnected"
    );
}

async fn run_inbound<R, E>(
    mut reader: R,
    hub: &ChannelHub,
    client: &Arc<HubClient>,
    done: &CancellationToken,
) where
    R: Stream<Item = Result<SocketFrame, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let frame = tokio::select! {
            () = done.cancelled() => return,
            frame = reader.next() => frame,
        };
        match frame {
            None => {
                debug!("socket stream ended");
                return;
            }
            Some(Err(e)) => {
                debug!(error = %e, "socket read failed");
                return;
            }
            Some(Ok(SocketFrame::Close)) => {
                info!("client sent close frame");
                return;
            }
            Some(Ok(SocketFrame::Text(text))) => {
                let _ = apply_control(hub, client, &text);
            }
            Some(Ok(SocketFrame::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => {
                    let _ = apply_control(hub, client, text);
                }
                Err(_) => debug!(len = data.len(), "non-UTF-8 binary frame ignored"),
            },
            Some(Ok(SocketFrame::Ping(_) | SocketFrame::Pong(_))) => {}
        }
    }
}

async fn run_outbound<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Arc<str>>,
    ping_interval: Option<Duration>,
    done: &CancellationToken,
) where
    W: Sink<SocketFrame> + Unpin,
    W::Error: fmt::Display,
{
    let mut ping = match ping_interval {
        Some(period) if !period.is_zero() => {
            let mut interval = tokio::time::interval(period);
            // Skip the immediate first tick
            let _ = interval.tick().await;
            Some(interval)
        }
        _ => None,
    };

    loop {
        let frame = tokio::select! {
            () = done.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(text) => SocketFrame::Text(text.to_string()),
                None => break,
            },
            () = next_tick(&mut ping) => SocketFrame::Ping(Bytes::new()),
        };
        if let Err(e) = writer.send(frame).await {
            debug!(error = %e, "socket write failed");
            break;
        }
    }
    let _ = writer.close().await;
}

async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc as fmpsc;
    use tokio::time::timeout;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    type Inbound = fmpsc::UnboundedSender<Result<SocketFrame, String>>;
    type Outbound = fmpsc::UnboundedReceiver<SocketFrame>;

    fn no_ping() -> SocketConfig {
        SocketConfig {
            ping_interval: None,
            ..SocketConfig::default()
        }
    }

    fn spawn_session(
        hub: &Arc<ChannelHub>,
        config: SocketConfig,
    ) -> (Inbound, Outbound, tokio::task::JoinHandle<()>) {
        let (in_tx, in_rx) = fmpsc::unbounded();
        let (out_tx, out_rx) = fmpsc::unbounded();
        let handle = tokio::spawn(run_socket_session(
            in_rx,
            out_tx,
            Arc::clone(hub),
            TenantId::from("T1"),
            config,
        ));
        (in_tx, out_rx, handle)
    }

    fn text(s: &str) -> Result<SocketFrame, String> {
        Ok(SocketFrame::Text(s.to_string()))
    }

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        timeout(TIMEOUT, async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn apply_control_subscribe_and_unsubscribe() {
        let hub = ChannelHub::default();
        let (client, _rx) = hub.connect();

        assert_eq!(
            apply_control(&hub, &client, r#"{"action":"subscribe","channel":"orders-topic"}"#),
            ControlOutcome::Subscribed("orders-topic".into())
        );
        assert_eq!(hub.subscriber_count("orders-topic"), 1);

        assert_eq!(
            apply_control(&hub, &client, r#"{"action":"unsubscribe","channel":"orders-topic"}"#),
            ControlOutcome::Unsubscribed("orders-topic".into())
        );
        assert!(!hub.has_channel("orders-topic"));
    }

    #[test]
    fn apply_control_rejects_bad_payloads() {
        let hub = ChannelHub::default();
        let (client, _rx) = hub.connect();

        assert_eq!(apply_control(&hub, &client, "not json"), ControlOutcome::Malformed);
        assert_eq!(apply_control(&hub, &client, r#"{"channel":"x"}"#), ControlOutcome::Malformed);
        assert_eq!(
            apply_control(&hub, &client, r#"{"action":"subscribe"}"#),
            ControlOutcome::Malformed
        );
        assert_eq!(
            apply_control(&hub, &client, r#"{"action":"join","channel":"x"}"#),
            ControlOutcome::UnknownAction("join".into())
        );
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_then_receive_broadcast() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, mut out_rx, handle) = spawn_session(&hub, no_ping());

        in_tx
            .unbounded_send(text(r#"{"action":"subscribe","channel":"orders-topic"}"#))
            .unwrap();
        wait_for(|| hub.subscriber_count("orders-topic") == 1).await;

        assert_eq!(hub.publish("orders-topic", Arc::from("{\"n\":1}")), 1);
        let frame = timeout(TIMEOUT, out_rx.next()).await.unwrap().unwrap();
        assert_eq!(frame, SocketFrame::Text("{\"n\":1}".into()));

        drop(in_tx);
        timeout(TIMEOUT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_message_keeps_session_open() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, _out_rx, handle) = spawn_session(&hub, no_ping());

        in_tx.unbounded_send(text("{{garbage")).unwrap();
        in_tx
            .unbounded_send(text(r#"{"action":"subscribe","channel":"a"}"#))
            .unwrap();
        wait_for(|| hub.has_channel("a")).await;
        assert!(!handle.is_finished());

        drop(in_tx);
        timeout(TIMEOUT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn binary_utf8_is_treated_as_text() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, _out_rx, handle) = spawn_session(&hub, no_ping());

        in_tx
            .unbounded_send(Ok(SocketFrame::Binary(Bytes::from_static(
                br#"{"action":"subscribe","channel":"bin"}"#,
            ))))
            .unwrap();
        wait_for(|| hub.has_channel("bin")).await;

        drop(in_tx);
        timeout(TIMEOUT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn teardown_removes_all_memberships() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, mut out_rx, handle) = spawn_session(&hub, no_ping());

        for ch in ["a", "b", "c"] {
            in_tx
                .unbounded_send(text(&format!(r#"{{"action":"subscribe","channel":"{ch}"}}"#)))
                .unwrap();
        }
        wait_for(|| hub.channel_count() == 3).await;

        in_tx.unbounded_send(Err("connection reset".into())).unwrap();
        timeout(TIMEOUT, handle).await.unwrap().unwrap();

        assert_eq!(hub.channel_count(), 0);
        // outbound closed the writer
        assert!(timeout(TIMEOUT, out_rx.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_frame_ends_session() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, _out_rx, handle) = spawn_session(&hub, no_ping());

        in_tx
            .unbounded_send(text(r#"{"action":"subscribe","channel":"a"}"#))
            .unwrap();
        in_tx.unbounded_send(Ok(SocketFrame::Close)).unwrap();
        timeout(TIMEOUT, handle).await.unwrap().unwrap();
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn write_failure_ends_session() {
        let hub = Arc::new(ChannelHub::default());
        let (in_tx, out_rx, handle) = spawn_session(&hub, no_ping());

        in_tx
            .unbounded_send(text(r#"{"action":"subscribe","channel":"a"}"#))
            .unwrap();
        wait_for(|| hub.has_channel("a")).await;

        drop(out_rx);
        let _ = hub.publish("a", Arc::from("x"));
        timeout(TIMEOUT, handle).await.unwrap().unwrap();
        assert_eq!(hub.channel_count(), 0);
        drop(in_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn pings_after_interval() {
        let hub = Arc::new(ChannelHub::default());
        let config = SocketConfig {
            ping_interval: Some(Duration::from_secs(30)),
            ..SocketConfig::default()
        };
        let (in_tx, mut out_rx, handle) = spawn_session(&hub, config);

        let start = tokio::time::Instant::now();
        let frame = out_rx.next().await.unwrap();
        assert_eq!(frame, SocketFrame::Ping(Bytes::new()));
        assert!(start.elapsed() >= Duration::from_secs(30));

        drop(in_tx);
        handle.await.unwrap();
    }
}
