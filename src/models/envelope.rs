//! Wire models for the cross-window message channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message delivered to the widget's window, as seen by the bus listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// True only for browser-generated events; script-dispatched ones are untrusted.
    #[serde(rename = "isTrusted")]
    pub is_trusted: bool,
    pub origin: String,
    /// Raw message payload, expected to be a JSON-encoded envelope.
    pub data: String,
}

impl MessageEvent {
    pub fn trusted(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            is_trusted: true,
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// Versioned `{ _v, e, d }` envelope carried in `MessageEvent::data`.
///
/// `_v` is only checked for presence and type. Unknown top-level fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "_v")]
    pub version: String,
    #[serde(rename = "e")]
    pub event: String,
    #[serde(rename = "d")]
    pub data: Map<String, Value>,
}

/// Events the bridge knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    OnAuthorized,
    OnContext,
}

impl EventName {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "on_authorized" => Some(EventName::OnAuthorized),
            "on_context" => Some(EventName::OnContext),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            EventName::OnAuthorized => "on_authorized",
            EventName::OnContext => "on_context",
        }
    }
}

/// Payload handed to subscribers: the envelope's `d` and the origin it arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub origin: String,
    pub data: Map<String, Value>,
}

impl EventData {
    /// `d.token` of an `on_authorized` payload, if it is a string.
    pub fn token(&self) -> Option<&str> {
        self.data.get("token").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_from_wire() {
        assert_eq!(EventName::from_wire("on_authorized"), Some(EventName::OnAuthorized));
        assert_eq!(EventName::from_wire("on_context"), Some(EventName::OnContext));
        assert_eq!(EventName::from_wire("onAuthorized"), None);
        assert_eq!(EventName::from_wire(""), None);
    }

    #[test]
    fn envelope_ignores_extra_fields() {
        let env: Envelope =
            serde_json::from_str(r#"{"_v":"1","e":"on_context","d":{},"extra":true}"#).unwrap();
        assert_eq!(env.event, "on_context");
        assert!(env.data.is_empty());
    }

    #[test]
    fn token_requires_string() {
        let mut data = Map::new();
        data.insert("token".into(), Value::from(42));
        let evt = EventData {
            origin: "https://hub.tarken.ag".into(),
            data,
        };
        assert_eq!(evt.token(), None);
    }
}
