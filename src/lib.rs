//! Authentication and context bridge for TEx widgets embedded in the Tarken Hub.
//!
//! A widget mounted inside the host's iframe receives `{ _v, e, d }` envelopes over
//! the page message bus. The bridge validates their origin and shape, fans them out
//! to subscribers, resolves one authenticated Hub API session per mount and keeps the
//! location context current. Outside an iframe it falls back to the local TEx
//! configuration and the page query string.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod services;

pub use auth::{HubHttpClient, Session, SessionResolver};
pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use handlers::http::AppState;
pub use providers::{use_tarken_api, use_tex_context, TexProviders, TexViewContainer, ViewState};
pub use services::{BridgeInitializer, BridgeMode, BridgeState, ContextResolver, TexNamespace};

use axum::routing::{get, post};
use handlers::http;

/// Build the dev host router (health, message injection, bridge inspection).
/// Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let bridge_routes = axum::Router::new()
        .route("/messages", post(http::post_message))
        .route("/state", get(http::bridge_state))
        .route("/context", get(http::bridge_context));

    axum::Router::new()
        .route("/health", get(http::health))
        .nest("/bridge", bridge_routes)
        .with_state(state)
}
