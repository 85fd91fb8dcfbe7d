//! Tenant-scoped routing rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::ids::{RouteId, TenantId};

/// How a route's match value is compared against an event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
    /// Event type must equal the match value.
    Exact,
    /// Event type must start with the match value.
    Prefix,
}

impl MatchKind {
    /// Canonical uppercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Prefix => "PREFIX",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchKind {
    type Err = GatewayError;

    /// Case-insensitive; anything other than EXACT or PREFIX is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EXACT" => Ok(Self::Exact),
            "PREFIX" => Ok(Self::Prefix),
            other => Err(GatewayError::Validation(format!(
                "invalid match_type: {other}"
            ))),
        }
    }
}

/// A tenant-owned rule mapping an event-type pattern to a target channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Route identifier.
    pub id: RouteId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Comparison kind.
    #[serde(rename = "match_type")]
    pub match_kind: MatchKind,
    /// Value compared against the event type.
    pub match_value: String,
    /// Channel that receives matching events.
    pub target_channel: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Whether this rule selects the given event type.
    pub fn matches(&self, event_type: &str) -> bool {
        match self.match_kind {
            MatchKind::Exact => event_type == self.match_value,
            MatchKind::Prefix => event_type.starts_with(&self.match_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(kind: MatchKind, value: &str) -> Route {
        Route {
            id: RouteId::new(),
            tenant_id: TenantId::from("T1"),
            match_kind: kind,
            match_value: value.into(),
            target_channel: "topic".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("exact".parse::<MatchKind>().unwrap(), MatchKind::Exact);
        assert_eq!("Prefix".parse::<MatchKind>().unwrap(), MatchKind::Prefix);
        assert_eq!("PREFIX".parse::<MatchKind>().unwrap(), MatchKind::Prefix);
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        let err = "regex".parse::<MatchKind>().unwrap_err();
        assert_eq!(err.to_string(), "invalid match_type: REGEX");
    }

    #[test]
    fn exact_requires_equality() {
        let r = route(MatchKind::Exact, "order.created");
        assert!(r.matches("order.created"));
        assert!(!r.matches("order.created.v2"));
        assert!(!r.matches("order."));
        assert!(!r.matches("ORDER.CREATED"));
    }

    #[test]
    fn prefix_requires_starts_with() {
        let r = route(MatchKind::Prefix, "order.");
        assert!(r.matches("order.shipped"));
        assert!(r.matches("order."));
        assert!(!r.matches("order"));
        assert!(!r.matches("user.order.shipped"));
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let r = route(MatchKind::Prefix, "");
        assert!(r.matches("anything"));
    }

    #[test]
    fn serializes_as_match_type() {
        let value = serde_json::to_value(route(MatchKind::Prefix, "a")).unwrap();
        assert_eq!(value["match_type"], "PREFIX");
    }
}
