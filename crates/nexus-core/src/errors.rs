//! Error taxonomy for the gateway.
//!
//! Delivery-level failures (full subscriber queues, slow consumers) are not
//! represented here: they are silent drops, never errors.

use thiserror::Error;

/// Message of the validation error raised for an empty event type.
pub const MISSING_EVENT_TYPE: &str = "event type is required";

/// Top-level error type for gateway operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request is malformed. Surfaced to the caller, never retried.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid API key, or tenant mismatch.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The administration store could not answer a lookup.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// A broadcast payload could not be built.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// The validation error for an ingest request without a type.
    #[must_use]
    pub fn missing_event_type() -> Self {
        Self::Validation(MISSING_EVENT_TYPE.into())
    }

    /// Whether the caller is at fault (4xx class).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Authentication(_))
    }

    /// Short classification string for logging.
    #[must_use]
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication(_) => "authentication",
            Self::Lookup(_) => "lookup",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_type_message() {
        let err = GatewayError::missing_event_type();
        assert_eq!(err.to_string(), "event type is required");
        assert!(err.is_client_error());
    }

    #[test]
    fn classification() {
        assert!(GatewayError::Authentication("no key".into()).is_client_error());
        assert!(!GatewayError::Lookup("db down".into()).is_client_error());
        assert!(!GatewayError::Serialization("bad".into()).is_client_error());
        assert!(!GatewayError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(GatewayError::Lookup(String::new()).error_kind(), "lookup");
        assert_eq!(
            GatewayError::Serialization(String::new()).error_kind(),
            "serialization"
        );
    }

    #[test]
    fn json_error_converts_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::Serialization(_)));
    }
}
