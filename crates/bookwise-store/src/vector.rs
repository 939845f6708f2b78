//! Vector index collaborator — an opaque batch-accepting sink plus search.
//!
//! The index owns embedding computation; the pipeline only hands it
//! (text, metadata) records and asks it similarity questions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bookwise_core::{Error, Result};

/// A record submitted to or returned from the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub text: String,
    pub metadata: serde_json::Value,
}

impl VectorRecord {
    /// Read a string metadata field, empty when absent.
    pub fn metadata_str(&self, key: &str) -> &str {
        self.metadata.get(key).and_then(|v| v.as_str()).unwrap_or("")
    }
}

/// External vector index interface.
///
/// `add_batch` callers are responsible for batching (≤100 records per call).
/// Result counts for `search` are the index's own default.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add_batch(&self, records: &[VectorRecord]) -> Result<()>;

    async fn search(&self, query: &str) -> Result<Vec<VectorRecord>>;

    /// Remove all records previously submitted for a source key.
    async fn delete_by_source(&self, source_key: &str) -> Result<()>;
}

/// HTTP client for a remote vector index service.
pub struct HttpVectorIndex {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<VectorRecord>,
}

impl HttpVectorIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn add_batch(&self, records: &[VectorRecord]) -> Result<()> {
        let url = format!("{}/documents", self.base_url);
        debug!("Submitting {} records to {}", records.len(), url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "documents": records }))
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorIndex(format!("API error {}: {}", status, body)));
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<VectorRecord>> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorIndex(format!("API error {}: {}", status, body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorIndex(format!("Malformed search response: {}", e)))?;
        Ok(parsed.results)
    }

    async fn delete_by_source(&self, source_key: &str) -> Result<()> {
        let url = format!("{}/documents/delete", self.base_url);
        debug!("Deleting records for source {} via {}", source_key, url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "sourceId": source_key }))
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorIndex(format!("API error {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_str_reads_fields() {
        let record = VectorRecord {
            text: "body".into(),
            metadata: serde_json::json!({ "title": "A Book", "chunkIndex": 3 }),
        };
        assert_eq!(record.metadata_str("title"), "A Book");
        assert_eq!(record.metadata_str("author"), "");
        // Non-string fields read as empty rather than panicking.
        assert_eq!(record.metadata_str("chunkIndex"), "");
    }
}
