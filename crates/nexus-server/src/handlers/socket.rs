//! `GET /ws`: WebSocket upgrade onto the bidirectional lifecycle.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt, future};
use nexus_core::ids::TenantId;
use nexus_realtime::{ChannelHub, SocketConfig, SocketFrame, run_socket_session};

use crate::auth::AuthenticatedTenant;
use crate::server::GatewayState;

/// Upgrade an authenticated request to a WebSocket session.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Extension(AuthenticatedTenant(tenant_id)): Extension<AuthenticatedTenant>,
) -> Response {
    let config = state.config.socket.clone();
    let hub = Arc::clone(&state.hub);
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |socket| serve_socket(socket, hub, tenant_id, config))
}

async fn serve_socket(
    socket: WebSocket,
    hub: Arc<ChannelHub>,
    tenant_id: TenantId,
    config: SocketConfig,
) {
    let (sink, stream) = socket.split();
    let reader = stream.map(|msg| msg.map(from_message));
    let writer =
        sink.with(|frame: SocketFrame| future::ready(Ok::<_, axum::Error>(to_message(frame))));
    run_socket_session(reader, writer, hub, tenant_id, config).await;
}

fn from_message(msg: Message) -> SocketFrame {
    match msg {
        Message::Text(text) => SocketFrame::Text(text.as_str().to_owned()),
        Message::Binary(data) => SocketFrame::Binary(data),
        Message::Ping(data) => SocketFrame::Ping(data),
        Message::Pong(data) => SocketFrame::Pong(data),
        Message::Close(_) => SocketFrame::Close,
    }
}

fn to_message(frame: SocketFrame) -> Message {
    match frame {
        SocketFrame::Text(text) => Message::Text(text.into()),
        SocketFrame::Binary(data) => Message::Binary(data),
        SocketFrame::Ping(data) => Message::Ping(data),
        SocketFrame::Pong(data) => Message::Pong(data),
        SocketFrame::Close => Message::Close(None),
    }
}
