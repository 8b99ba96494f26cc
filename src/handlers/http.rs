//! Dev host handlers: inject bus messages and inspect the mounted view.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::models::MessageEvent;
use crate::providers::TexViewContainer;
use crate::services::{BridgeMode, BridgeState, TexNamespace};

/// Shared state for the dev host.
#[derive(Clone)]
pub struct AppState {
    pub namespace: TexNamespace,
    pub view: Arc<TexViewContainer>,
}

impl AppState {
    pub fn new(namespace: TexNamespace, view: Arc<TexViewContainer>) -> Self {
        Self { namespace, view }
    }

    pub fn namespace(&self) -> &TexNamespace {
        &self.namespace
    }

    pub fn view(&self) -> &TexViewContainer {
        &self.view
    }
}

/// POST /bridge/messages: deliver a message event as the host page would.
/// Always accepted; invalid messages are dropped by the channel.
pub async fn post_message(
    State(state): State<AppState>,
    Json(evt): Json<MessageEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.namespace().post_message(&evt);
    (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
}

/// GET /bridge/state: initializer state.
pub async fn bridge_state(State(state): State<AppState>) -> Json<serde_json::Value> {
    let initializer = state.view().initializer();
    let mode = match initializer.mode() {
        BridgeMode::Embedded => "embedded",
        BridgeMode::Standalone => "standalone",
    };
    let current = initializer.state();
    let body = match &current {
        BridgeState::Pending => json!({ "state": current.as_str(), "mode": mode }),
        BridgeState::Authorized(session) => json!({
            "state": current.as_str(),
            "mode": mode,
            "session_id": session.id(),
            "environment": session.environment(),
            "base_url": session.http_client().base_url(),
        }),
        BridgeState::Failed(e) => json!({
            "state": current.as_str(),
            "mode": mode,
            "error": e.to_string(),
        }),
    };
    Json(body)
}

/// GET /bridge/context: latest context for the mounted location.
pub async fn bridge_context(State(state): State<AppState>) -> Json<serde_json::Value> {
    let context = state.view().context();
    let body = match context.current() {
        None => json!({ "location": context.location(), "context": null }),
        Some(Ok(data)) => json!({ "location": context.location(), "context": data }),
        Some(Err(e)) => json!({
            "location": context.location(),
            "context": null,
            "error": e.to_string(),
        }),
    };
    Json(body)
}

/// GET /health: liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "tex-devhost" })),
    )
}
