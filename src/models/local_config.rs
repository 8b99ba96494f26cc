//! Local TEx configuration file (`.tex/tex.config.json`) used in standalone mode.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default location of the local configuration, relative to the project root.
pub const DEFAULT_LOCAL_CONFIG_PATH: &str = ".tex/tex.config.json";

/// Written by `tex init` / `tex login`. Every section is optional on read so that
/// a half-initialized file reports missing credentials instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LocalConfigFile {
    #[serde(rename = "$version", default)]
    #[validate(range(min = 1, max = 1))]
    pub version: Option<u32>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub state: Option<LocalState>,
    #[serde(default)]
    pub identities: Option<Identities>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identities {
    #[serde(default)]
    pub service_account: Option<ServiceAccount>,
    #[serde(default)]
    pub current_impersonation: Option<Impersonation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub client_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Impersonation {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl LocalConfigFile {
    /// Non-empty impersonation access token, if the user has logged in.
    pub fn access_token(&self) -> Option<&str> {
        self.identities
            .as_ref()?
            .current_impersonation
            .as_ref()?
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    /// Non-empty organization id selected locally.
    pub fn organization_id(&self) -> Option<&str> {
        self.state
            .as_ref()?
            .organization_id
            .as_deref()
            .filter(|o| !o.is_empty())
    }

    pub fn client_id(&self) -> Option<&str> {
        self.identities
            .as_ref()?
            .service_account
            .as_ref()
            .map(|s| s.client_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file_parses() {
        let raw = r#"{
            "$version": 1,
            "environment": "development",
            "state": { "organization_id": "org-1" },
            "identities": {
                "service_account": { "client_id": "cli" },
                "current_impersonation": { "access_token": "abc" }
            }
        }"#;
        let cfg: LocalConfigFile = serde_json::from_str(raw).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.access_token(), Some("abc"));
        assert_eq!(cfg.organization_id(), Some("org-1"));
        assert_eq!(cfg.client_id(), Some("cli"));
        assert_eq!(cfg.environment.as_deref(), Some("development"));
    }

    #[test]
    fn nulls_yield_no_credentials() {
        let raw = r#"{ "state": null, "identities": { "current_impersonation": null } }"#;
        let cfg: LocalConfigFile = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.access_token(), None);
        assert_eq!(cfg.organization_id(), None);
    }

    #[test]
    fn unsupported_version_fails_validation() {
        let cfg: LocalConfigFile = serde_json::from_str(r#"{ "$version": 2 }"#).unwrap();
        assert!(cfg.validate().is_err());
    }
}
