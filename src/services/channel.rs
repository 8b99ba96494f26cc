//! Origin-validated message channel: trust + origin filtering and envelope validation.

use serde_json::Value;
use std::fmt;
use tracing::debug;

use super::dispatcher::EventDispatcher;
use crate::models::{Envelope, EventData, MessageEvent, OriginAllowList};

/// Why a message was dropped. Never surfaced to callers of `handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Untrusted,
    OriginNotAllowed(String),
    InvalidJson,
    NotAnObject,
    InvalidShape(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Untrusted => f.write_str("untrusted event"),
            Rejection::OriginNotAllowed(o) => write!(f, "origin not allowed: {o}"),
            Rejection::InvalidJson => f.write_str("data is not JSON"),
            Rejection::NotAnObject => f.write_str("data is not a JSON object"),
            Rejection::InvalidShape(field) => write!(f, "missing or mistyped field `{field}`"),
        }
    }
}

/// Listens on the page's message bus and forwards valid envelopes to the dispatcher.
#[derive(Clone)]
pub struct MessageChannel {
    allowed_origins: OriginAllowList,
    dispatcher: EventDispatcher,
}

impl MessageChannel {
    pub fn new(allowed_origins: OriginAllowList, dispatcher: EventDispatcher) -> Self {
        Self {
            allowed_origins,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn allowed_origins(&self) -> &OriginAllowList {
        &self.allowed_origins
    }

    /// Check trust, origin and envelope shape.
    pub fn validate(&self, evt: &MessageEvent) -> Result<Envelope, Rejection> {
        if !evt.is_trusted {
            return Err(Rejection::Untrusted);
        }
        if !self.allowed_origins.contains(&evt.origin) {
            return Err(Rejection::OriginNotAllowed(evt.origin.clone()));
        }
        parse_envelope(&evt.data)
    }

    /// Handle one bus message. Every failure is a silent drop.
    pub fn handle(&self, evt: &MessageEvent) {
        let envelope = match self.validate(evt) {
            Ok(envelope) => envelope,
            Err(reason) => {
                debug!(origin = %evt.origin, %reason, "message dropped");
                return;
            }
        };

        let payload = EventData {
            origin: evt.origin.clone(),
            data: envelope.data,
        };
        self.dispatcher.dispatch(&envelope.event, &payload);
    }
}

/// Parse `{ "_v": string, "e": string, "d": object }`.
pub fn parse_envelope(data: &str) -> Result<Envelope, Rejection> {
    let value: Value = serde_json::from_str(data).map_err(|_| Rejection::InvalidJson)?;
    let obj = value.as_object().ok_or(Rejection::NotAnObject)?;

    if !obj.get("_v").is_some_and(Value::is_string) {
        return Err(Rejection::InvalidShape("_v"));
    }
    if !obj.get("e").is_some_and(Value::is_string) {
        return Err(Rejection::InvalidShape("e"));
    }
    if !obj.get("d").is_some_and(Value::is_object) {
        return Err(Rejection::InvalidShape("d"));
    }

    serde_json::from_value(value).map_err(|_| Rejection::NotAnObject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventName;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const VALID: &str = r#"{"_v":"1","e":"on_authorized","d":{"token":"abc"}}"#;

    fn channel_with_counter() -> (MessageChannel, Arc<AtomicUsize>) {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let _sub = dispatcher.subscribe_fn(EventName::OnAuthorized, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (MessageChannel::new(OriginAllowList::default(), dispatcher), hits)
    }

    #[test]
    fn valid_message_is_dispatched_with_origin() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let s = seen.clone();
        let _sub = dispatcher.subscribe_fn(EventName::OnAuthorized, move |evt| {
            *s.lock().unwrap() = Some(evt.clone());
        });
        let channel = MessageChannel::new(OriginAllowList::default(), dispatcher);
        channel.handle(&MessageEvent::trusted("https://hub.tarken.ag", VALID));

        let evt = seen.lock().unwrap().clone().unwrap();
        assert_eq!(evt.origin, "https://hub.tarken.ag");
        assert_eq!(evt.token(), Some("abc"));
    }

    #[test]
    fn untrusted_event_is_dropped() {
        let (channel, hits) = channel_with_counter();
        let evt = MessageEvent {
            is_trusted: false,
            origin: "https://hub.tarken.ag".into(),
            data: VALID.into(),
        };
        assert_eq!(channel.validate(&evt), Err(Rejection::Untrusted));
        channel.handle(&evt);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn foreign_origin_is_dropped() {
        let (channel, hits) = channel_with_counter();
        for origin in ["http://evil.example", "https://hub.tarken.ag.evil.example", "null", ""] {
            channel.handle(&MessageEvent::trusted(origin, VALID));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let (channel, hits) = channel_with_counter();
        let cases = [
            ("not json", Rejection::InvalidJson),
            ("", Rejection::InvalidJson),
            ("42", Rejection::NotAnObject),
            ("\"on_authorized\"", Rejection::NotAnObject),
            ("null", Rejection::NotAnObject),
            ("[1,2]", Rejection::NotAnObject),
            (r#"{"e":"on_authorized","d":{}}"#, Rejection::InvalidShape("_v")),
            (r#"{"_v":1,"e":"on_authorized","d":{}}"#, Rejection::InvalidShape("_v")),
            (r#"{"_v":"1","d":{}}"#, Rejection::InvalidShape("e")),
            (r#"{"_v":"1","e":7,"d":{}}"#, Rejection::InvalidShape("e")),
            (r#"{"_v":"1","e":"on_authorized"}"#, Rejection::InvalidShape("d")),
            (r#"{"_v":"1","e":"on_authorized","d":"x"}"#, Rejection::InvalidShape("d")),
            (r#"{"_v":"1","e":"on_authorized","d":null}"#, Rejection::InvalidShape("d")),
        ];
        for (data, expected) in cases {
            let evt = MessageEvent::trusted("https://hub-dev.tarken.ag", data);
            assert_eq!(channel.validate(&evt), Err(expected), "data: {data}");
            channel.handle(&evt);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_event_name_is_ignored() {
        let (channel, hits) = channel_with_counter();
        channel.handle(&MessageEvent::trusted(
            "http://localhost:3000",
            r#"{"_v":"1","e":"on_refresh","d":{}}"#,
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
