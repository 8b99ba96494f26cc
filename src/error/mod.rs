//! Bridge error types.
//!
//! Malformed or untrusted channel messages are not errors: they are
//! dropped by the channel and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by session resolution, initialization and the provider surface.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to create an authenticated HTTP client: the access token has expired")]
    ExpiredToken,

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("No environment is configured for allowed origin {0}")]
    UnknownOriginEnvironment(String),

    #[error("Failed to impersonate user: you must run $ tex login")]
    MissingLocalCredentials,

    #[error("Missing or invalid local configuration file ({0}). Make sure you have run \"tex init\"")]
    LocalConfigUnavailable(String),

    #[error("Invalid local configuration: {0}")]
    InvalidLocalConfig(String),

    #[error("No authorization received from the host within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Authorization handshake was cancelled")]
    HandshakeCancelled,

    #[error("Missing required context key `{key}` for location {location}")]
    MissingContextKey { location: String, key: String },

    #[error("Unknown context location: {0}")]
    UnknownLocation(String),

    #[error("{0} must be used within a TexViewContainer")]
    NotInitialized(&'static str),

    #[error("Context requested for {requested} but the view was mounted for {mounted}")]
    LocationMismatch { requested: String, mounted: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hub API returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BridgeError {
    /// Whether the error is something the developer fixes locally (login, init)
    /// rather than a protocol or configuration fault.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            BridgeError::MissingLocalCredentials
                | BridgeError::LocalConfigUnavailable(_)
                | BridgeError::ExpiredToken
        )
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::ExpiredToken | BridgeError::MissingLocalCredentials => {
                StatusCode::UNAUTHORIZED
            }
            BridgeError::NotInitialized(_) | BridgeError::HandshakeTimeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BridgeError::UnknownLocation(_)
            | BridgeError::LocationMismatch { .. }
            | BridgeError::MissingContextKey { .. }
            | BridgeError::Serialization(_) => StatusCode::BAD_REQUEST,
            BridgeError::Http(_) | BridgeError::HttpStatus { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
