//! Where the standalone path loads the local TEx configuration from.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::models::LocalConfigFile;

/// Source of the local configuration file.
#[async_trait]
pub trait LocalConfigSource: Send + Sync {
    async fn load(&self) -> BridgeResult<LocalConfigFile>;
}

/// Reads the configuration from disk.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocalConfigSource for FileConfigSource {
    async fn load(&self) -> BridgeResult<LocalConfigFile> {
        debug!(path = %self.path.display(), "loading local config");
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| BridgeError::LocalConfigUnavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_slice(&raw)
            .map_err(|e| BridgeError::LocalConfigUnavailable(format!("{}: {}", self.path.display(), e)))
    }
}

/// Fetches the configuration over HTTP, as a page served next to `.tex/` would.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: reqwest::Client,
    url: String,
}

impl HttpConfigSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl LocalConfigSource for HttpConfigSource {
    async fn load(&self) -> BridgeResult<LocalConfigFile> {
        debug!(url = %self.url, "fetching local config");
        let unavailable = |e: reqwest::Error| BridgeError::LocalConfigUnavailable(format!("{}: {}", self.url, e));
        let resp = self
            .client
            .get(&self.url)
            .timeout(crate::auth::HTTP_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?;
        resp.json::<LocalConfigFile>().await.map_err(unavailable)
    }
}

/// Fixed in-memory configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigSource(pub LocalConfigFile);

#[async_trait]
impl LocalConfigSource for StaticConfigSource {
    async fn load(&self) -> BridgeResult<LocalConfigFile> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = FileConfigSource::new("/nonexistent/.tex/tex.config.json");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, BridgeError::LocalConfigUnavailable(_)));
        assert!(err.is_user_actionable());
    }

    #[tokio::test]
    async fn invalid_json_is_unavailable() {
        let path = std::env::temp_dir().join(format!("tex-config-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let err = FileConfigSource::new(&path).load().await.unwrap_err();
        assert!(matches!(err, BridgeError::LocalConfigUnavailable(_)));
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("tex-config-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            br#"{"$version":1,"environment":"staging","state":{"organization_id":"o"},"identities":{"current_impersonation":{"access_token":"t"}}}"#,
        )
        .await
        .unwrap();
        let cfg = FileConfigSource::new(&path).load().await.unwrap();
        assert_eq!(cfg.access_token(), Some("t"));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
