//! Hub environments and the origin/host tables that map onto them.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parent origins allowed to talk to the widget over the message channel.
pub const ALLOWED_PARENT_ORIGINS: [&str; 5] = [
    "https://hub-dev.tarken.ag",
    "https://hub-homolog.tarken.ag",
    "https://hub.tarken.ag",
    // hub-web-client local development
    "http://localhost:8080",
    "http://localhost:3000",
];

/// Hub environment an API host is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// API host serving this environment. Staging shares the production API.
    pub fn api_host(&self) -> &'static str {
        match self {
            Environment::Development => "dev.api.hub.tarken.ag",
            Environment::Staging | Environment::Production => "prod.api.hub.tarken.ag",
        }
    }

    /// `https://<host>/api/v1` for this environment.
    pub fn api_base_url(&self) -> String {
        format!("https://{}/api/v1", self.api_host())
    }

    /// Environment of a known hub origin. Local development origins have none.
    pub fn from_origin(origin: &str) -> Option<Self> {
        match origin {
            "https://hub-dev.tarken.ag" => Some(Environment::Development),
            "https://hub-homolog.tarken.ag" => Some(Environment::Staging),
            "https://hub.tarken.ag" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl FromStr for Environment {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(BridgeError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match allow-list of parent origins.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Vec<String>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }
}

impl Default for OriginAllowList {
    fn default() -> Self {
        Self::new(ALLOWED_PARENT_ORIGINS)
    }
}
