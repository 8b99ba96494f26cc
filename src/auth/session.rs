//! Session resolution: bearer token + environment -> authenticated Hub client.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::client::HubHttpClient;
use super::jwt;
use crate::error::{BridgeError, BridgeResult};
use crate::models::{Environment, LocalConfigFile};

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated state for one widget mount. Immutable once built.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    environment: Environment,
    authorization_token: String,
    http_client: HubHttpClient,
}

impl Session {
    /// Mount-scoped identifier, used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Value for the `Authorization` header (`Bearer <token>`).
    pub fn authorization_token(&self) -> &str {
        &self.authorization_token
    }

    /// The raw token without the `Bearer ` prefix.
    pub fn bearer_token(&self) -> &str {
        self.authorization_token
            .strip_prefix(BEARER_PREFIX)
            .unwrap_or(&self.authorization_token)
    }

    pub fn http_client(&self) -> &HubHttpClient {
        &self.http_client
    }
}

/// Builds sessions for a token and an environment.
#[derive(Debug, Clone, Default)]
pub struct SessionResolver {
    /// Replaces the environment's API base URL (local API, tests).
    api_base_override: Option<String>,
}

impl SessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_override = Some(base_url.into());
        self
    }

    /// Resolve a session. Fails with `ExpiredToken` when the token's decoded `exp`
    /// is at or before now; tokens whose expiry cannot be decoded are accepted.
    #[instrument(skip(self, token))]
    pub fn resolve(&self, token: &str, environment: Environment) -> BridgeResult<Arc<Session>> {
        jwt::ensure_not_expired(token)?;

        let base_url = self
            .api_base_override
            .clone()
            .unwrap_or_else(|| environment.api_base_url());
        let authorization_token = format!("{BEARER_PREFIX}{token}");
        let http_client = HubHttpClient::new(base_url, &authorization_token)?;

        let session = Session {
            id: Uuid::new_v4(),
            environment,
            authorization_token,
            http_client,
        };
        info!(session_id = %session.id, environment = %environment, base_url = %session.http_client.base_url(), "session resolved");
        Ok(Arc::new(session))
    }

    /// Resolve with an environment given as a string tag.
    pub fn resolve_tag(&self, token: &str, environment: &str) -> BridgeResult<Arc<Session>> {
        let environment: Environment = environment.parse()?;
        self.resolve(token, environment)
    }

    /// Standalone path: impersonate the locally logged-in user from the TEx config file.
    #[instrument(skip_all)]
    pub fn resolve_local(&self, config: &LocalConfigFile) -> BridgeResult<Arc<Session>> {
        let (token, _organization_id) = match (config.access_token(), config.organization_id()) {
            (Some(token), Some(org)) => (token, org),
            _ => return Err(BridgeError::MissingLocalCredentials),
        };
        config
            .validate()
            .map_err(|e| BridgeError::InvalidLocalConfig(e.to_string()))?;
        let environment = config.environment.as_deref().ok_or_else(|| {
            BridgeError::InvalidLocalConfig("missing `environment`".to_string())
        })?;
        self.resolve_tag(token, environment)
    }
}
