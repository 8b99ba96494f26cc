//! HTTP handlers for the dev host.

pub mod http;

pub use http::{bridge_context, bridge_state, health, post_message, AppState};
