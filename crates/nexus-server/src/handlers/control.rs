//! Control-plane routes: tenants, API keys, and routing rules.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use nexus_core::Route;
use nexus_core::ids::TenantId;
use nexus_store::{ApiKey, Tenant};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::server::ControlState;

#[derive(Debug, Deserialize)]
struct CreateTenantRequest {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreateApiKeyRequest {
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct CreateRouteRequest {
    #[serde(default)]
    match_type: String,
    #[serde(default)]
    match_value: String,
    #[serde(default)]
    target_channel: String,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request("invalid body"))
}

/// `POST /control/tenants`
pub async fn create_tenant(
    State(state): State<ControlState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Tenant>)> {
    let req: CreateTenantRequest = parse_body(&body)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("invalid body"));
    }
    let tenant = state.store.create_tenant(&req.name)?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// `GET /control/tenants`
pub async fn list_tenants(State(state): State<ControlState>) -> ApiResult<Json<Vec<Tenant>>> {
    Ok(Json(state.store.list_tenants()?))
}

/// `POST /control/tenants/{tenant_id}/api-keys`
pub async fn create_api_key(
    State(state): State<ControlState>,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ApiKey>)> {
    let req: CreateApiKeyRequest = parse_body(&body)?;
    let key = state
        .store
        .create_api_key(&TenantId::from(tenant_id), &req.label)?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// `GET /control/tenants/{tenant_id}/routes`
pub async fn list_routes(
    State(state): State<ControlState>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Json<Vec<Route>>> {
    Ok(Json(state.store.list_routes(&TenantId::from(tenant_id))?))
}

/// `POST /control/tenants/{tenant_id}/routes`
pub async fn create_route(
    State(state): State<ControlState>,
    Path(tenant_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Route>)> {
    let req: CreateRouteRequest = parse_body(&body)?;
    if req.match_type.is_empty() || req.match_value.is_empty() || req.target_channel.is_empty() {
        return Err(ApiError::bad_request("missing fields"));
    }
    let route = state.store.create_route(
        &TenantId::from(tenant_id),
        &req.match_type,
        &req.match_value,
        &req.target_channel,
    )?;
    Ok((StatusCode::CREATED, Json(route)))
}
