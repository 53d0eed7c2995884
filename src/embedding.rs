//! Embedding service abstraction and the OpenAI implementation.
//!
//! [`Embedder::embed`] takes one text and returns one vector. Failures come
//! back as an [`EmbeddingError`] value rather than aborting anything: the
//! pipeline driver decides to drop the record.
//!
//! There is no retry. A 429 or 5xx is reported as a failure for that one
//! record and the run moves on.
//!
//! ```rust,no_run
//! # use issue_indexer::config::EmbeddingConfig;
//! # use issue_indexer::embedding::{Embedder, OpenAIEmbedder};
//! # async fn demo() -> anyhow::Result<()> {
//! let embedder = OpenAIEmbedder::new(&EmbeddingConfig::default(), "sk-...")?;
//! match embedder.embed("Login fails. Stack trace attached").await {
//!     Ok(vector) => println!("{} dims", vector.len()),
//!     Err(e) => eprintln!("dropped: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{Config, EmbeddingConfig};
use crate::error::EmbeddingError;

/// Single-text-in, single-vector-out embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;

    /// Embed one text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}

/// Calls `POST {base_url}/embeddings`.
pub struct OpenAIEmbedder {
    model: String,
    dims: Option<usize>,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Build from the process config. Fails if `OPENAI_API_KEY` was not set.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.embedding, config.embed_api_key()?)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(EmbeddingError::RateLimited(body_text));
            }
            return Err(EmbeddingError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let vector = parse_openai_response(&json)?;
        check_dims(self.dims, vector)
    }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> std::result::Result<Vec<f32>, EmbeddingError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::MalformedResponse("missing data[0].embedding".into()))?;

    let mut vector = Vec::with_capacity(embedding.len());
    for value in embedding {
        let v = value
            .as_f64()
            .ok_or_else(|| EmbeddingError::MalformedResponse("non-numeric component".into()))?;
        vector.push(v as f32);
    }

    if vector.is_empty() {
        return Err(EmbeddingError::MalformedResponse("empty embedding".into()));
    }
    Ok(vector)
}

fn check_dims(
    expected: Option<usize>,
    vector: Vec<f32>,
) -> std::result::Result<Vec<f32>, EmbeddingError> {
    match expected {
        Some(expected) if vector.len() != expected => Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(vector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_embedding() {
        let body = json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.5, -1.25, 2.0]}],
            "model": "text-embedding-ada-002"
        });
        assert_eq!(parse_openai_response(&body).unwrap(), vec![0.5, -1.25, 2.0]);
    }

    #[test]
    fn rejects_missing_or_empty_data() {
        assert!(matches!(
            parse_openai_response(&json!({"data": []})),
            Err(EmbeddingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_openai_response(&json!({"data": [{"embedding": []}]})),
            Err(EmbeddingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_openai_response(&json!({"error": {"message": "bad"}})),
            Err(EmbeddingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_components() {
        let body = json!({"data": [{"embedding": [0.1, "x"]}]});
        assert!(parse_openai_response(&body).is_err());
    }

    #[test]
    fn dims_are_enforced_only_when_configured() {
        assert!(check_dims(None, vec![1.0, 2.0]).is_ok());
        assert!(check_dims(Some(2), vec![1.0, 2.0]).is_ok());
        assert_eq!(
            check_dims(Some(3), vec![1.0, 2.0]),
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn empty_text_fails_without_a_request() {
        let embedder = OpenAIEmbedder::new(
            &EmbeddingConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                ..EmbeddingConfig::default()
            },
            "key",
        )
        .unwrap();
        assert_eq!(embedder.embed("   ").await, Err(EmbeddingError::EmptyText));
    }
}
