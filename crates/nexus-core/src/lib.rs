//! # nexus-core
//!
//! Foundation types shared by every Nexus crate:
//!
//! - **Branded IDs**: `EventId`, `TenantId`, `RouteId`, `ApiKeyId`, `ClientId`
//! - **Envelope**: [`EventEnvelope`], the canonical form of one ingested event
//! - **Routes**: [`Route`] and [`MatchKind`], tenant-owned channel rules
//! - **Errors**: [`GatewayError`] taxonomy via `thiserror`
//! - **Collaborators**: [`RouteLookup`] and [`TenantAuthenticator`], the only
//!   capabilities the routing core consumes from the administration store

#![deny(unsafe_code)]

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod lookup;
pub mod routes;

pub use channel::default_tenant_channel;
pub use envelope::{DeliveryState, EventEnvelope, EventStatus, SourceInfo};
pub use errors::GatewayError;
pub use lookup::{RouteLookup, TenantAuthenticator};
pub use routes::{MatchKind, Route};
