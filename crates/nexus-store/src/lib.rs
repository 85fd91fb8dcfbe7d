//! # nexus-store
//!
//! SQLite-backed administration store: tenants, their API keys, and their
//! routing rules. [`ControlStore`] is the only type the rest of the gateway
//! talks to; it implements the `RouteLookup` and `TenantAuthenticator`
//! capabilities from `nexus-core`.

#![deny(unsafe_code)]

pub mod control;
pub mod database;
pub mod error;
mod lookup;
pub mod schema;

pub use control::{ApiKey, ControlStore, Tenant};
pub use database::Database;
pub use error::StoreError;
