//! Tenant route resolution.

use std::sync::Arc;

use nexus_core::ids::TenantId;
use nexus_core::{GatewayError, RouteLookup, default_tenant_channel};
use tracing::{debug, warn};

/// Maps `(tenant, event type)` to target channels using the tenant's routes.
#[derive(Clone)]
pub struct RoutingResolver {
    lookup: Arc<dyn RouteLookup>,
}

impl RoutingResolver {
    /// Resolve against the given rule source.
    pub fn new(lookup: Arc<dyn RouteLookup>) -> Self {
        Self { lookup }
    }

    /// Target channels of every route matching `event_type`, in lookup order.
    ///
    /// No match yields an empty list, not an error. A lookup failure is
    /// returned as [`GatewayError::Lookup`].
    pub async fn resolve(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let routes = self.lookup.routes_for_tenant(tenant_id).await?;
        Ok(routes
            .into_iter()
            .filter(|r| r.matches(event_type))
            .map(|r| r.target_channel)
            .collect())
    }

    /// [`resolve`](Self::resolve), falling back to `tenant:<id>:events` when
    /// nothing matches or the lookup fails. Never empty.
    pub async fn resolve_or_default(&self, tenant_id: &TenantId, event_type: &str) -> Vec<String> {
        match self.resolve(tenant_id, event_type).await {
            Ok(channels) if !channels.is_empty() => channels,
            Ok(_) => {
                debug!(%tenant_id, event_type, "no matching routes, using default channel");
                vec![default_tenant_channel(tenant_id)]
            }
            Err(e) => {
                warn!(
                    %tenant_id,
                    event_type,
                    error = %e,
                    kind = e.error_kind(),
                    "route resolution failed, using default channel"
                );
                vec![default_tenant_channel(tenant_id)]
            }
        }
    }
}
