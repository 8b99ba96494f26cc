//! Context resolver: location-scoped context from `on_context` events or the query string.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::dispatcher::SubscriptionGuard;
use super::initializer::BridgeMode;
use super::namespace::TexNamespace;
use crate::error::BridgeError;
use crate::models::{ContextData, ContextLocation, EventData};

pub type ContextResult = Result<ContextData, Arc<BridgeError>>;

/// Holds the latest context for one location. Embedded resolvers follow
/// `on_context` (last valid event wins); standalone ones resolve once.
pub struct ContextResolver {
    location: ContextLocation,
    current: Arc<watch::Sender<Option<ContextResult>>>,
    _listener: Option<SubscriptionGuard>,
}

impl ContextResolver {
    /// Track `on_context` events from the host.
    pub fn embedded(location: ContextLocation, namespace: &TexNamespace) -> Self {
        let current = Arc::new(watch::Sender::new(None));
        let sink = current.clone();
        let listener = namespace
            .on_context_fn(move |evt: &EventData| match location.parse_event(&evt.data) {
                Ok(data) => {
                    debug!(%location, origin = %evt.origin, "context updated");
                    sink.send_replace(Some(Ok(data)));
                }
                Err(e) => debug!(%location, error = %e, "context event ignored"),
            })
            .into_guard();

        Self {
            location,
            current,
            _listener: Some(listener),
        }
    }

    /// Resolve once from the page query string (`tex__<key>` parameters).
    pub fn standalone(location: ContextLocation, query: &str) -> Self {
        let result = location.parse_query(query).map_err(Arc::new);
        match &result {
            Ok(_) => info!(%location, "context resolved from query string"),
            Err(e) => debug!(%location, error = %e, "context query incomplete"),
        }
        Self {
            location,
            current: Arc::new(watch::Sender::new(Some(result))),
            _listener: None,
        }
    }

    pub fn for_mode(
        mode: BridgeMode,
        location: ContextLocation,
        namespace: &TexNamespace,
        query: &str,
    ) -> Self {
        match mode {
            BridgeMode::Embedded => Self::embedded(location, namespace),
            BridgeMode::Standalone => Self::standalone(location, query),
        }
    }

    pub fn location(&self) -> ContextLocation {
        self.location
    }

    /// Latest context, `None` until the host has sent one.
    pub fn current(&self) -> Option<ContextResult> {
        self.current.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<ContextResult>> {
        self.current.subscribe()
    }

    /// Wait for the first context value.
    pub async fn ready(&self) -> ContextResult {
        let mut rx = self.current.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(result) = current {
                return result;
            }
            if rx.changed().await.is_err() {
                return Err(Arc::new(BridgeError::HandshakeCancelled));
            }
        }
    }
}
