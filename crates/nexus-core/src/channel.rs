//! Channel naming.
//!
//! A channel is a bare string key in the subscriber registries. The only
//! derived name is the per-tenant fallback used when no route matches.

use crate::ids::TenantId;

/// The fallback topic for a tenant: `tenant:<tenant_id>:events`.
pub fn default_tenant_channel(tenant_id: &TenantId) -> String {
    format!("tenant:{tenant_id}:events")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channel_format() {
        let tenant = TenantId::from("T1");
        assert_eq!(default_tenant_channel(&tenant), "tenant:T1:events");
    }

    #[test]
    fn default_channel_is_deterministic() {
        let tenant = TenantId::new();
        assert_eq!(
            default_tenant_channel(&tenant),
            default_tenant_channel(&tenant.clone())
        );
    }
}
