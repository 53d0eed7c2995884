//! Error types for the extract → stage → embed → upload pipeline.
//!
//! [`PipelineError`] covers the fatal classes: any of them halts the run.
//! [`EmbeddingError`] is per-record and never escapes the pipeline driver;
//! the record it belongs to is dropped from the index instead.

use thiserror::Error;

/// Fatal pipeline errors. None of these are retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The tracker could not be reached, rejected the credentials, or
    /// returned something that could not be decoded.
    #[error("Issue source unavailable: {0}")]
    SourceUnavailable(String),

    /// The tracker has no group with the requested identifier.
    #[error("Issue source group not found: {0}")]
    SourceNotFound(String),

    /// The staging store failed to read or write.
    #[error("Staging store I/O error: {0}")]
    StoreIo(String),

    /// The search index could not be reached or rejected the whole batch.
    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),
}

impl PipelineError {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn source_not_found(group_id: &str) -> Self {
        Self::SourceNotFound(group_id.to_string())
    }

    pub fn store_io(msg: impl Into<String>) -> Self {
        Self::StoreIo(msg.into())
    }

    pub fn index_unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        Self::StoreIo(e.to_string())
    }
}

/// Why a single embedding call produced no vector.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    #[error("empty input text")]
    EmptyText,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
