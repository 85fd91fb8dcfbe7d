//! API key authentication for the gateway routes.
//!
//! Every request under the middleware must present `X-Api-Key`. The key
//! resolves to exactly one tenant, which handlers read from the
//! [`AuthenticatedTenant`] extension. An `X-Tenant-Id` header, when sent,
//! must name that same tenant.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use nexus_core::TenantAuthenticator;
use nexus_core::ids::TenantId;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Header carrying the API key secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Optional header asserting the caller's tenant.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Tenant resolved from the request's API key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedTenant(pub TenantId);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Middleware: authenticate the request and attach [`AuthenticatedTenant`].
///
/// Missing key, unknown key, and tenant mismatch are 401. A failing lookup
/// is a 500.
pub async fn require_api_key(
    State(authenticator): State<Arc<dyn TenantAuthenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_owned();
    let Some(api_key) = header_str(req.headers(), API_KEY_HEADER).map(str::to_owned) else {
        warn!(path, "request without api key");
        return Err(ApiError::unauthorized("missing X-Api-Key"));
    };
    let claimed = header_str(req.headers(), TENANT_ID_HEADER).map(str::to_owned);

    let Some(tenant_id) = authenticator.tenant_for_key(&api_key).await? else {
        warn!(path, "unknown api key");
        return Err(ApiError::unauthorized("invalid api key"));
    };

    if let Some(claimed) = claimed {
        if claimed != tenant_id.as_str() {
            warn!(claimed_tenant = %claimed, tenant_id = %tenant_id, "tenant mismatch");
            return Err(ApiError::unauthorized("tenant mismatch"));
        }
    }

    debug!(tenant_id = %tenant_id, "request authenticated");
    let _ = req.extensions_mut().insert(AuthenticatedTenant(tenant_id));
    Ok(next.run(req).await)
}
