//! Event ingestion.
//!
//! [`EventService`] is the seam for ingestion backends. [`LogEventService`]
//! records each event in the log and keeps nothing; a persistent backend
//! would implement the same trait.

use async_trait::async_trait;
use chrono::Utc;
use nexus_core::ids::{EventId, TenantId};
use nexus_core::{DeliveryState, EventEnvelope, EventStatus, GatewayError, SourceInfo};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::info;

/// A producer's event before validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IngestRequest {
    /// Event type. Must be non-empty.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub event_type: String,
    /// Free-form payload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
    /// Free-form metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
    /// Producer descriptor, filled in by the transport.
    #[serde(skip)]
    pub source: SourceInfo,
}

/// A JSON `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ingestion backend.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Validate `req` and build its envelope for `tenant_id`.
    ///
    /// Fails with [`GatewayError::Validation`] when the type is empty. Does
    /// not route or broadcast.
    async fn ingest(
        &self,
        tenant_id: &TenantId,
        req: IngestRequest,
    ) -> Result<EventEnvelope, GatewayError>;
}

/// Ingestion backend that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEventService;

impl LogEventService {
    /// Create the service.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventService for LogEventService {
    async fn ingest(
        &self,
        tenant_id: &TenantId,
        req: IngestRequest,
    ) -> Result<EventEnvelope, GatewayError> {
        let envelope = build_envelope(tenant_id, req)?;
        info!(
            event_id = %envelope.id,
            tenant_id = %envelope.tenant_id,
            event_type = %envelope.event_type,
            protocol = %envelope.source.protocol,
            "event ingested"
        );
        Ok(envelope)
    }
}

/// Validate and stamp an envelope: fresh ID, UTC timestamp, `PENDING`.
pub fn build_envelope(
    tenant_id: &TenantId,
    req: IngestRequest,
) -> Result<EventEnvelope, GatewayError> {
    if req.event_type.is_empty() {
        return Err(GatewayError::missing_event_type());
    }
    Ok(EventEnvelope {
        id: EventId::new(),
        tenant_id: tenant_id.clone(),
        event_type: req.event_type,
        source: req.source,
        data: req.data,
        metadata: req.metadata,
        status: EventStatus {
            ingested_at: Utc::now(),
            delivery_state: DeliveryState::Pending,
        },
    })
}

#[cfg(test)]
mod tests {
    use nexus_core::errors::MISSING_EVENT_TYPE;
    use nexus_logging::capture_logs;
    use serde_json::json;
    use tracing::Level;

    use super::*;

    fn request(event_type: &str) -> IngestRequest {
        IngestRequest {
            event_type: event_type.into(),
            data: json!({"order_id": 42}).as_object().cloned().unwrap(),
            metadata: Map::new(),
            source: SourceInfo {
                protocol: "REST".into(),
                endpoint: "/api/v1/events".into(),
                ip: "10.0.0.1".into(),
                ..SourceInfo::default()
            },
        }
    }

    #[tokio::test]
    async fn ingest_stamps_envelope() {
        let tenant = TenantId::from("T1");
        let before = Utc::now();
        let env = LogEventService::new()
            .ingest(&tenant, request("order.created"))
            .await
            .unwrap();

        assert_eq!(env.tenant_id, tenant);
        assert_eq!(env.event_type, "order.created");
        assert_eq!(env.data["order_id"], 42);
        assert_eq!(env.source.ip, "10.0.0.1");
        assert_eq!(env.status.delivery_state, DeliveryState::Pending);
        assert!(env.status.ingested_at >= before);
        assert!(!env.id.is_empty());
    }

    #[tokio::test]
    async fn ingest_ids_are_unique() {
        let svc = LogEventService::new();
        let tenant = TenantId::from("T1");
        let a = svc.ingest(&tenant, request("a")).await.unwrap();
        let b = svc.ingest(&tenant, request("a")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn empty_type_is_rejected() {
        let (logs, _guard) = capture_logs();
        let err = LogEventService::new()
            .ingest(&TenantId::from("T1"), request(""))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Validation(MISSING_EVENT_TYPE.into()));
        assert!(logs.find("event ingested").is_empty());
    }

    #[tokio::test]
    async fn ingest_logs_event_fields() {
        let (logs, _guard) = capture_logs();
        let env = LogEventService::new()
            .ingest(&TenantId::from("T1"), request("user.signup"))
            .await
            .unwrap();

        assert!(logs.has_event(Level::INFO, "event ingested"));
        let event = &logs.find("event ingested")[0];
        assert_eq!(event.field("event_id"), Some(env.id.as_str()));
        assert_eq!(event.field("tenant_id"), Some("T1"));
        assert_eq!(event.field("event_type"), Some("user.signup"));
        assert_eq!(event.field("protocol"), Some("REST"));
    }

    #[test]
    fn request_deserializes_without_optional_fields() {
        let req: IngestRequest = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(req.event_type, "ping");
        assert!(req.data.is_empty());
        assert!(req.metadata.is_empty());
    }

    #[test]
    fn request_without_type_deserializes_empty() {
        let req: IngestRequest = serde_json::from_str(r#"{"data": {"a": 1}}"#).unwrap();
        assert!(req.event_type.is_empty());
        assert!(build_envelope(&TenantId::from("T1"), req).is_err());
    }

    #[test]
    fn null_fields_deserialize_as_defaults() {
        let req: IngestRequest =
            serde_json::from_str(r#"{"type": "order.created", "data": null, "metadata": null}"#)
                .unwrap();
        assert_eq!(req.event_type, "order.created");
        assert!(req.data.is_empty());
        assert!(req.metadata.is_empty());
    }

    #[test]
    fn null_type_fails_validation_not_parsing() {
        let req: IngestRequest = serde_json::from_str(r#"{"type": null}"#).unwrap();
        assert!(req.event_type.is_empty());
        let err = build_envelope(&TenantId::from("T1"), req).unwrap_err();
        assert_eq!(err, GatewayError::Validation(MISSING_EVENT_TYPE.into()));
    }

    #[test]
    fn non_object_data_is_still_rejected() {
        assert!(serde_json::from_str::<IngestRequest>(r#"{"type": "a", "data": [1]}"#).is_err());
    }
}
