//! Capabilities the routing core consumes from the administration store.
//!
//! Both traits are object-safe so the server can hold them as
//! `Arc<dyn ...>` and tests can swap in fixed tables.

use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::ids::TenantId;
use crate::routes::Route;

/// Rule lookup for a tenant.
#[async_trait]
pub trait RouteLookup: Send + Sync {
    /// All routes owned by `tenant_id`. An empty list is a normal outcome.
    ///
    /// Failures are reported as [`GatewayError::Lookup`].
    async fn routes_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Route>, GatewayError>;
}

/// API key to tenant resolution.
#[async_trait]
pub trait TenantAuthenticator: Send + Sync {
    /// The tenant owning `api_key`, or `None` when the key is unknown.
    ///
    /// Failures are reported as [`GatewayError::Lookup`].
    async fn tenant_for_key(&self, api_key: &str) -> Result<Option<TenantId>, GatewayError>;
}
