//! Location-scoped context data and its per-location schema.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Prefix of the query parameters that carry context in standalone mode.
const QUERY_KEY_PREFIX: &str = "tex__";

/// Places in the host where a widget can be mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextLocation {
    #[serde(rename = "workflow.ticket.type.credit-request.detail")]
    CreditRequestDetail,
    #[serde(rename = "global.navigation-bar.menu")]
    NavigationBarMenu,
}

impl ContextLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextLocation::CreditRequestDetail => "workflow.ticket.type.credit-request.detail",
            ContextLocation::NavigationBarMenu => "global.navigation-bar.menu",
        }
    }

    /// Keys the host must provide for this location.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ContextLocation::CreditRequestDetail => &["organizationId", "ticketId"],
            ContextLocation::NavigationBarMenu => &["organizationId"],
        }
    }

    /// Build the typed context from the `on_context` payload.
    pub fn parse_event(&self, data: &Map<String, Value>) -> BridgeResult<ContextData> {
        self.build(|key| data.get(key).and_then(Value::as_str).map(str::to_string))
    }

    /// Build the typed context from a page query string (`?tex__organizationId=...`).
    pub fn parse_query(&self, query: &str) -> BridgeResult<ContextData> {
        let params: HashMap<String, String> =
            url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect();
        self.build(|key| params.get(&format!("{QUERY_KEY_PREFIX}{key}")).cloned())
    }

    fn build<F>(&self, lookup: F) -> BridgeResult<ContextData>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| BridgeError::MissingContextKey {
                location: self.as_str().to_string(),
                key: key.to_string(),
            })
        };

        Ok(match self {
            ContextLocation::CreditRequestDetail => ContextData::CreditRequestDetail {
                organization_id: require("organizationId")?,
                ticket_id: require("ticketId")?,
            },
            ContextLocation::NavigationBarMenu => ContextData::NavigationBarMenu {
                organization_id: require("organizationId")?,
            },
        })
    }
}

impl FromStr for ContextLocation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow.ticket.type.credit-request.detail" => Ok(ContextLocation::CreditRequestDetail),
            "global.navigation-bar.menu" => Ok(ContextLocation::NavigationBarMenu),
            other => Err(BridgeError::UnknownLocation(other.to_string())),
        }
    }
}

impl fmt::Display for ContextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context supplied by the host for the location the widget is mounted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextData {
    #[serde(rename_all = "camelCase")]
    CreditRequestDetail {
        organization_id: String,
        ticket_id: String,
    },
    #[serde(rename_all = "camelCase")]
    NavigationBarMenu { organization_id: String },
}

impl ContextData {
    pub fn location(&self) -> ContextLocation {
        match self {
            ContextData::CreditRequestDetail { .. } => ContextLocation::CreditRequestDetail,
            ContextData::NavigationBarMenu { .. } => ContextLocation::NavigationBarMenu,
        }
    }

    pub fn organization_id(&self) -> &str {
        match self {
            ContextData::CreditRequestDetail {
                organization_id, ..
            }
            | ContextData::NavigationBarMenu { organization_id } => organization_id,
        }
    }

    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            ContextData::CreditRequestDetail { ticket_id, .. } => Some(ticket_id),
            ContextData::NavigationBarMenu { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_query_for_credit_request() {
        let data = ContextLocation::CreditRequestDetail
            .parse_query("?tex__organizationId=org-1&tex__ticketId=t%2042&other=x")
            .unwrap();
        assert_eq!(
            data,
            ContextData::CreditRequestDetail {
                organization_id: "org-1".into(),
                ticket_id: "t 42".into(),
            }
        );
    }

    #[test]
    fn parse_query_missing_key_fails() {
        let err = ContextLocation::CreditRequestDetail
            .parse_query("tex__organizationId=org-1")
            .unwrap_err();
        match err {
            BridgeError::MissingContextKey { location, key } => {
                assert_eq!(location, "workflow.ticket.type.credit-request.detail");
                assert_eq!(key, "ticketId");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_event_for_navigation_bar() {
        let payload = json!({ "organizationId": "org-9", "ignored": 1 });
        let data = ContextLocation::NavigationBarMenu
            .parse_event(payload.as_object().unwrap())
            .unwrap();
        assert_eq!(data.organization_id(), "org-9");
        assert_eq!(data.ticket_id(), None);
        assert_eq!(data.location(), ContextLocation::NavigationBarMenu);
    }

    #[test]
    fn parse_event_rejects_non_string_value() {
        let payload = json!({ "organizationId": 7, "ticketId": "t" });
        assert!(ContextLocation::CreditRequestDetail
            .parse_event(payload.as_object().unwrap())
            .is_err());
    }

    #[test]
    fn location_round_trips_through_str() {
        let loc: ContextLocation = "global.navigation-bar.menu".parse().unwrap();
        assert_eq!(loc, ContextLocation::NavigationBarMenu);
        assert!("global.unknown".parse::<ContextLocation>().is_err());
    }

    #[test]
    fn context_serializes_camel_case() {
        let data = ContextData::CreditRequestDetail {
            organization_id: "o".into(),
            ticket_id: "t".into(),
        };
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({ "organizationId": "o", "ticketId": "t" })
        );
    }
}
