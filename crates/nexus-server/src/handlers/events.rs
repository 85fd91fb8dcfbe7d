//! `POST /api/v1/events`: ingest, resolve, broadcast.

use std::net::SocketAddr;

use axum::Extension;
use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode, Uri};
use bytes::Bytes;
use nexus_core::SourceInfo;
use nexus_events::IngestRequest;
use serde::Serialize;
use tracing::warn;

use crate::auth::AuthenticatedTenant;
use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;

/// Body of a 202 response.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// ID of the accepted event.
    pub event_id: String,
    /// Always `"accepted"`.
    pub status: &'static str,
}

/// Accept an event for best-effort delivery.
///
/// The response does not wait on subscribers. A broadcast that fails on one
/// channel is logged and the remaining channels still receive the event.
pub async fn ingest_event(
    State(state): State<GatewayState>,
    Extension(AuthenticatedTenant(tenant_id)): Extension<AuthenticatedTenant>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let mut req: IngestRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, tenant_id = %tenant_id, "invalid ingest body");
        ApiError::bad_request("invalid json body")
    })?;
    req.source = SourceInfo {
        protocol: "REST".into(),
        endpoint: uri.path().to_owned(),
        ip: peer.to_string(),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned(),
        ..SourceInfo::default()
    };

    let envelope = state.events.ingest(&tenant_id, req).await?;

    let channels = state
        .resolver
        .resolve_or_default(&tenant_id, &envelope.event_type)
        .await;
    for channel in &channels {
        if let Err(e) = state.broadcaster.broadcast_event(channel, &envelope).await {
            warn!(
                error = %e,
                kind = e.error_kind(),
                tenant_id = %tenant_id,
                channel = %channel,
                event_id = %envelope.id,
                "failed to broadcast event"
            );
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            event_id: envelope.id.into_inner(),
            status: "accepted",
        }),
    ))
}
