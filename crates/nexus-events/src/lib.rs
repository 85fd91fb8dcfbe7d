//! # nexus-events
//!
//! The two steps between an accepted request and fan-out:
//!
//! - [`EventService`]: validates an ingest request and stamps an
//!   [`EventEnvelope`](nexus_core::EventEnvelope)
//! - [`RoutingResolver`]: turns a tenant's routes into target channels

#![deny(unsafe_code)]

pub mod ingest;
pub mod resolver;

pub use ingest::{EventService, IngestRequest, LogEventService};
pub use resolver::RoutingResolver;
