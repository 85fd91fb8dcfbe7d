//! `GET /sse/stream`: server-sent events for one channel.

use axum::Extension;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use nexus_core::default_tenant_channel;
use nexus_realtime::sse_stream;
use serde::Deserialize;

use crate::auth::AuthenticatedTenant;
use crate::server::GatewayState;

/// Query parameters of a stream request.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Channel to follow. Defaults to the tenant's default channel.
    pub channel: Option<String>,
}

/// Open an event stream.
///
/// The stream ends when the client goes away or the server shuts down.
pub async fn sse_subscribe(
    State(state): State<GatewayState>,
    Extension(AuthenticatedTenant(tenant_id)): Extension<AuthenticatedTenant>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let channel = query
        .channel
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| default_tenant_channel(&tenant_id));

    let body = sse_stream(
        state.broker.clone(),
        channel,
        state.config.stream.clone(),
        state.shutdown.child_token(),
    );

    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
