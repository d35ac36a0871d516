//! JSON file registry source.

use crate::errors::LoadError;
use crate::storage::document::RegistryDocument;
use crate::storage::traits::{RegistrySource, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads the registry document from a JSON file on every fetch
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<RegistryDocument> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LoadError::SourceUnavailable(self.describe(), e.to_string()))?;
        RegistryDocument::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("oidc-registry-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let path = temp_path("fetch.json");
        tokio::fs::write(
            &path,
            r#"{ "api_resources": [{ "name": "api1", "display_name": "My API #1" }] }"#,
        )
        .await
        .unwrap();

        let source = FileRegistrySource::new(&path);
        let document = source.fetch().await.unwrap();
        assert_eq!(document.api_resources.len(), 1);
        assert!(document.clients.is_empty());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = FileRegistrySource::new(temp_path("missing.json"));
        let result = source.fetch().await;
        assert!(matches!(result, Err(LoadError::SourceUnavailable(_, _))));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let path = temp_path("malformed.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = FileRegistrySource::new(&path).fetch().await;
        assert!(matches!(result, Err(LoadError::ParseFailed(_))));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
