//! JSON-File Candidate Store
//!
//! Candidate pool backend for local runs and evaluation: a JSON file holding
//! an array of candidate records with precomputed embeddings. The file is
//! read once per `fetch_all` call so a pool refresh needs no restart.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use scopecast_core::CandidateRecord;

use crate::provider::{CandidateStore, ProviderError, ProviderResult};

/// Candidate store backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandidateStore for JsonFileStore {
    async fn fetch_all(&self) -> ProviderResult<Vec<CandidateRecord>> {
        let path = self.path.clone();
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ProviderError::ProviderUnavailable {
                message: format!("cannot read candidate pool {}: {}", path.display(), e),
            }
        })?;
        let records: Vec<CandidateRecord> = serde_json::from_str(&contents)
            .map_err(|e| ProviderError::parse(format!("invalid candidate pool: {}", e)))?;
        info!(pool = records.len(), path = %path.display(), "candidate pool loaded");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "Authentication", "embedding": [0.1, 0.2],
                 "source_label": "Estimation A", "tasks": []}}]"#
        )
        .unwrap();

        let store = JsonFileStore::new(file.path());
        let records = store.fetch_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Authentication");
        assert_eq!(records[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let store = JsonFileStore::new("/nonexistent/pool.json");
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, ProviderError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn malformed_pool_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let store = JsonFileStore::new(file.path());
        let err = store.fetch_all().await.unwrap_err();
        assert!(matches!(err, ProviderError::ParseError { .. }));
    }
}
