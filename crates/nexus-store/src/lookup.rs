//! Collaborator capabilities backed by the store.
//!
//! SQLite calls block on the connection mutex, so each lookup runs on the
//! blocking pool.

use async_trait::async_trait;
use nexus_core::ids::TenantId;
use nexus_core::{GatewayError, Route, RouteLookup, TenantAuthenticator};
use tokio::task;

use crate::control::ControlStore;
use crate::error::StoreError;

async fn run_blocking<T, F>(f: F) -> Result<T, GatewayError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| GatewayError::Internal(format!("store lookup task failed: {e}")))?
        .map_err(GatewayError::from)
}

#[async_trait]
impl RouteLookup for ControlStore {
    async fn routes_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Route>, GatewayError> {
        let store = self.clone();
        let tenant_id = tenant_id.clone();
        run_blocking(move || store.list_routes(&tenant_id)).await
    }
}

#[async_trait]
impl TenantAuthenticator for ControlStore {
    async fn tenant_for_key(&self, api_key: &str) -> Result<Option<TenantId>, GatewayError> {
        let store = self.clone();
        let api_key = api_key.to_owned();
        run_blocking(move || Ok(store.tenant_for_api_key(&api_key)?.map(|t| t.id))).await
    }
}
