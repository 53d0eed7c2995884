//! Search index upload: the Azure AI Search implementation.
//!
//! One [`SearchIndex::upload`] call sends one page of documents as a single
//! `docs/index` request with `@search.action = "upload"` on every entry
//! (insert or replace by key).
//!
//! The service answers 200 when every document was accepted and 207 when
//! some were not; both produce an [`UploadSummary`] with one
//! [`DocumentAck`] per document. Anything else, or a transport failure,
//! is [`PipelineError::IndexUnavailable`] and ends the run.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, SearchConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::models::EnrichedDocument;

/// A hosted index that accepts batches of enriched documents.
///
/// Callers only pass documents that carry an embedding.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upload(&self, documents: &[EnrichedDocument]) -> PipelineResult<UploadSummary>;
}

/// Per-document acknowledgment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentAck {
    pub key: String,
    pub status: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

/// Result of one upload call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<DocumentAck>,
}

impl UploadSummary {
    pub fn from_acks(results: Vec<DocumentAck>) -> Self {
        let succeeded = results.iter().filter(|r| r.status).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Summary for a batch the caller knows was fully accepted.
    pub fn all_succeeded(documents: &[EnrichedDocument]) -> Self {
        Self::from_acks(
            documents
                .iter()
                .map(|d| DocumentAck {
                    key: d.id.clone(),
                    status: true,
                    status_code: 200,
                    error_message: None,
                })
                .collect(),
        )
    }
}

#[derive(Serialize)]
struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    #[serde(flatten)]
    document: &'a EnrichedDocument,
}

#[derive(Serialize)]
struct IndexBatch<'a> {
    value: Vec<IndexAction<'a>>,
}

#[derive(Deserialize)]
struct IndexResponse {
    value: Vec<DocumentAck>,
}

pub struct AzureSearchIndex {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AzureSearchIndex {
    pub fn new(search: &SearchConfig, api_key: &str) -> Result<Self> {
        let endpoint = search.resolved_endpoint()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(search.timeout_secs))
            .build()?;

        Ok(Self {
            url: format!(
                "{}/indexes/{}/docs/index?api-version={}",
                endpoint, search.index, search.api_version
            ),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Build from the process config. Fails if `AZURE_SEARCH_API_KEY` was not set.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.search, config.search_key()?)
    }
}

#[async_trait]
impl SearchIndex for AzureSearchIndex {
    async fn upload(&self, documents: &[EnrichedDocument]) -> PipelineResult<UploadSummary> {
        let batch = IndexBatch {
            value: documents
                .iter()
                .map(|document| IndexAction {
                    action: "upload",
                    document,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&batch)
            .send()
            .await
            .map_err(|e| PipelineError::index_unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::index_unavailable(format!(
                "Search API error {}: {}",
                status, body
            )));
        }

        let parsed: IndexResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::index_unavailable(format!("invalid response: {}", e)))?;

        Ok(UploadSummary::from_acks(parsed.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueRecord;

    fn doc(id: i64) -> EnrichedDocument {
        let record = IssueRecord {
            id,
            title: "t".to_string(),
            description: "d".to_string(),
            state: "opened".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            author: "a".to_string(),
            labels: vec![],
        };
        EnrichedDocument::from_record(&record, vec![0.25]).unwrap()
    }

    #[test]
    fn batch_body_is_flat_with_action() {
        let docs = [doc(1), doc(2)];
        let batch = IndexBatch {
            value: docs
                .iter()
                .map(|document| IndexAction {
                    action: "upload",
                    document,
                })
                .collect(),
        };
        let json = serde_json::to_value(&batch).unwrap();
        let first = &json["value"][0];
        assert_eq!(first["@search.action"], "upload");
        assert_eq!(first["id"], "1");
        assert_eq!(first["labels"], "");
        assert_eq!(first["embedding"], serde_json::json!([0.25]));
    }

    #[test]
    fn summary_counts_partial_failures() {
        let body = r#"{"value": [
            {"key": "1", "status": true, "errorMessage": null, "statusCode": 201},
            {"key": "2", "status": false, "errorMessage": "bad vector", "statusCode": 400}
        ]}"#;
        let parsed: IndexResponse = serde_json::from_str(body).unwrap();
        let summary = UploadSummary::from_acks(parsed.value);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[1].error_message.as_deref(), Some("bad vector"));
    }

    #[test]
    fn url_uses_service_name() {
        let search = SearchConfig {
            endpoint: None,
            service_name: Some("acme".to_string()),
            index: "issues".to_string(),
            api_version: "2023-11-01".to_string(),
            timeout_secs: 5,
            api_key: None,
        };
        let index = AzureSearchIndex::new(&search, "k").unwrap();
        assert_eq!(
            index.url,
            "https://acme.search.windows.net/indexes/issues/docs/index?api-version=2023-11-01"
        );
    }
}
