//! Tenant, API key, and route administration.

use chrono::{DateTime, Utc};
use nexus_core::ids::{ApiKeyId, RouteId, TenantId};
use nexus_core::{MatchKind, Route};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::{info, instrument};

use crate::database::Database;
use crate::error::StoreError;

/// A tenant: the isolation boundary for events, keys, and routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tenant {
    /// Tenant identifier.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A credential that authenticates requests as one tenant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiKey {
    /// Key identifier.
    pub id: ApiKeyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Secret presented in `X-Api-Key`.
    pub secret: String,
    /// Free-form label.
    pub label: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Administration store over a shared [`Database`].
#[derive(Clone)]
pub struct ControlStore {
    db: Database,
}

impl ControlStore {
    /// Wrap an opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store over a fresh in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::in_memory()?))
    }

    /// Create a tenant.
    #[instrument(skip(self))]
    pub fn create_tenant(&self, name: &str) -> Result<Tenant, StoreError> {
        let tenant = Tenant {
            id: TenantId::new(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![tenant.id.as_str(), tenant.name, tenant.created_at],
            )?;
            Ok(())
        })?;
        info!(tenant_id = %tenant.id, "tenant created");
        Ok(tenant)
    }

    /// All tenants, oldest first.
    #[instrument(skip(self))]
    pub fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at FROM tenants ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Tenant {
                        id: TenantId::from_string(row.get(0)?),
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Issue a new `sk_`-prefixed secret for a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub fn create_api_key(&self, tenant_id: &TenantId, label: &str) -> Result<ApiKey, StoreError> {
        let key = ApiKey {
            id: ApiKeyId::new(),
            tenant_id: tenant_id.clone(),
            secret: format!("sk_{}", uuid::Uuid::new_v4()),
            label: label.to_string(),
            created_at: Utc::now(),
        };
        self.db.with_conn(|conn| {
            ensure_tenant(conn, tenant_id)?;
            let _ = conn.execute(
                "INSERT INTO api_keys (id, tenant_id, secret, label, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key.id.as_str(),
                    key.tenant_id.as_str(),
                    key.secret,
                    key.label,
                    key.created_at
                ],
            )?;
            Ok(())
        })?;
        info!(api_key_id = %key.id, "api key created");
        Ok(key)
    }

    /// The tenant owning `secret`, or `None` when no key matches.
    #[instrument(skip_all)]
    pub fn tenant_for_api_key(&self, secret: &str) -> Result<Option<Tenant>, StoreError> {
        self.db.with_conn(|conn| {
            let tenant = conn
                .query_row(
                    "SELECT t.id, t.name, t.created_at
                       FROM api_keys k
                       JOIN tenants t ON t.id = k.tenant_id
                      WHERE k.secret = ?1",
                    [secret],
                    |row| {
                        Ok(Tenant {
                            id: TenantId::from_string(row.get(0)?),
                            name: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(tenant)
        })
    }

    /// Add a routing rule. `match_kind` is case-insensitive and must be
    /// `EXACT` or `PREFIX`.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub fn create_route(
        &self,
        tenant_id: &TenantId,
        match_kind: &str,
        match_value: &str,
        target_channel: &str,
    ) -> Result<Route, StoreError> {
        let kind: MatchKind = match_kind
            .parse()
            .map_err(|_| StoreError::InvalidMatchKind(match_kind.to_uppercase()))?;
        let route = Route {
            id: RouteId::new(),
            tenant_id: tenant_id.clone(),
            match_kind: kind,
            match_value: match_value.to_string(),
            target_channel: target_channel.to_string(),
            created_at: Utc::now(),
        };
        self.db.with_conn(|conn| {
            ensure_tenant(conn, tenant_id)?;
            let _ = conn.execute(
                "INSERT INTO routes (id, tenant_id, match_type, match_value, target_channel, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    route.id.as_str(),
                    route.tenant_id.as_str(),
                    route.match_kind.as_str(),
                    route.match_value,
                    route.target_channel,
                    route.created_at
                ],
            )?;
            Ok(())
        })?;
        info!(route_id = %route.id, match_type = %route.match_kind, "route created");
        Ok(route)
    }

    /// A tenant's routes in creation order.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub fn list_routes(&self, tenant_id: &TenantId) -> Result<Vec<Route>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, match_type, match_value, target_channel, created_at
                   FROM routes
                  WHERE tenant_id = ?1
                  ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([tenant_id.as_str()], route_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn ensure_tenant(conn: &Connection, tenant_id: &TenantId) -> Result<(), StoreError> {
    let exists = conn
        .query_row("SELECT 1 FROM tenants WHERE id = ?1", [tenant_id.as_str()], |_| Ok(()))
        .optional()?;
    exists.ok_or_else(|| StoreError::NotFound(format!("tenant {tenant_id}")))
}

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    let raw_kind: String = row.get(2)?;
    let match_kind = raw_kind.parse::<MatchKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Route {
        id: RouteId::from_string(row.get(0)?),
        tenant_id: TenantId::from_string(row.get(1)?),
        match_kind,
        match_value: row.get(3)?,
        target_channel: row.get(4)?,
        created_at: row.get(5)?,
    })
}
