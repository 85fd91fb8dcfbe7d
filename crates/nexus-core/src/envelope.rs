//! The event envelope: one ingested event as it travels through routing and
//! fan-out.
//!
//! Envelopes are built once by the ingest pipeline and never mutated
//! afterwards; downstream components only borrow or serialize them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{EventId, TenantId};

/// Where an event came from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Transport protocol the producer used (e.g. `REST`).
    pub protocol: String,
    /// Endpoint path the event was submitted to.
    pub endpoint: String,
    /// Caller address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    /// Caller user agent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    /// Transport-specific extras.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

/// Delivery state of an envelope.
///
/// Only `PENDING` exists: fan-out is best-effort and nothing acknowledges
/// delivery, so no component advances the state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    /// Accepted for distribution.
    #[default]
    Pending,
}

/// Status record stamped at ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatus {
    /// UTC ingestion timestamp.
    pub ingested_at: DateTime<Utc>,
    /// Current delivery state.
    pub delivery_state: DeliveryState,
}

/// Canonical representation of one ingested event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event identifier.
    pub id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Event type, never empty.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Producer descriptor.
    pub source: SourceInfo,
    /// Free-form payload.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Ingestion status.
    pub status: EventStatus,
}
