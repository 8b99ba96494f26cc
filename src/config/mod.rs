//! Configuration loaded from environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{ContextLocation, OriginAllowList, DEFAULT_LOCAL_CONFIG_PATH};
use crate::services::{BridgeMode, FrameTopology};

/// Dev host and bridge configuration from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dev host bind address (e.g. `127.0.0.1:4173`).
    pub server_addr: SocketAddr,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    /// Local TEx configuration file used in standalone mode.
    pub local_config_path: PathBuf,
    /// Fetch the local configuration from this URL instead of `local_config_path`.
    pub local_config_url: Option<String>,
    /// Parent origins the channel accepts.
    pub allowed_origins: OriginAllowList,
    /// `TEX_RUNTIME=production` marks a production-like runtime.
    pub production: bool,
    /// Whether the widget runs inside the host's iframe.
    pub topology: FrameTopology,
    /// Optional limit on the embedded authorization wait.
    pub handshake_timeout: Option<Duration>,
    /// Location the view is mounted in.
    pub location: ContextLocation,
    /// Page query string, read for context in standalone mode.
    pub query: String,
    /// Replaces the environment's Hub API base URL.
    pub api_base_url: Option<String>,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let server_addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:4173".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let local_config_path = std::env::var("TEX_CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_LOCAL_CONFIG_PATH.to_string())
            .into();
        let local_config_url = std::env::var("TEX_CONFIG_URL").ok().filter(|s| !s.is_empty());
        let allowed_origins = match std::env::var("TEX_ALLOWED_ORIGINS") {
            Ok(raw) => parse_origins(&raw)?,
            Err(_) => OriginAllowList::default(),
        };
        let production = std::env::var("TEX_RUNTIME")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let topology = match std::env::var("TEX_FRAMED").ok().as_deref() {
            None | Some("") | Some("false") | Some("0") => FrameTopology::TopLevel,
            Some("true") | Some("1") => FrameTopology::Framed,
            Some("unknown") => FrameTopology::Unknown,
            Some(_) => return Err(ConfigLoadError::InvalidFramed),
        };

        let handshake_timeout = match std::env::var("TEX_HANDSHAKE_TIMEOUT_MS") {
            Ok(ms) => Some(Duration::from_millis(
                ms.parse()
                    .map_err(|_| ConfigLoadError::InvalidHandshakeTimeout)?,
            )),
            Err(_) => None,
        };

        let location = std::env::var("TEX_LOCATION")
            .unwrap_or_else(|_| ContextLocation::CreditRequestDetail.as_str().to_string())
            .parse::<ContextLocation>()
            .map_err(|_| ConfigLoadError::InvalidLocation)?;
        let query = std::env::var("TEX_QUERY").unwrap_or_default();
        let api_base_url = std::env::var("TEX_API_BASE_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            server_addr,
            log_level,
            local_config_path,
            local_config_url,
            allowed_origins,
            production,
            topology,
            handshake_timeout,
            location,
            query,
            api_base_url,
        })
    }

    pub fn mode(&self) -> BridgeMode {
        BridgeMode::detect(self.topology, self.production)
    }
}

/// Comma-separated list of exact origins (`scheme://host[:port]`).
fn parse_origins(raw: &str) -> Result<OriginAllowList, ConfigLoadError> {
    let origins: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        return Err(ConfigLoadError::InvalidAllowedOrigins);
    }
    for origin in &origins {
        let url = url::Url::parse(origin).map_err(|_| ConfigLoadError::InvalidAllowedOrigins)?;
        if url.origin().ascii_serialization() != *origin {
            return Err(ConfigLoadError::InvalidAllowedOrigins);
        }
    }
    Ok(OriginAllowList::new(origins))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,
    #[error("Invalid TEX_FRAMED (expected true, false or unknown)")]
    InvalidFramed,
    #[error("Invalid TEX_HANDSHAKE_TIMEOUT_MS")]
    InvalidHandshakeTimeout,
    #[error("Invalid TEX_LOCATION")]
    InvalidLocation,
    #[error("Invalid TEX_ALLOWED_ORIGINS (expected comma-separated origins)")]
    InvalidAllowedOrigins,
}
