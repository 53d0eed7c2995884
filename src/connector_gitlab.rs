//! GitLab group-issue connector.
//!
//! Lists every issue of a group through the GitLab REST API (v4) and
//! normalizes each one into an [`IssueRecord`].
//!
//! # Configuration
//!
//! ```toml
//! [tracker]
//! url = "https://gitlab.com"   # self-hosted instances work too
//! group_id = "1234"            # numeric id or full path ("acme/platform")
//! per_page = 100
//! ```
//!
//! The access token comes from `GITLAB_TOKEN` and is sent as the
//! `PRIVATE-TOKEN` header.
//!
//! # Pagination
//!
//! Requests `page=1,2,…` and follows the `X-Next-Page` response header
//! until it is empty. When the header is missing (some proxies strip it),
//! a short or empty page ends the walk instead.
//!
//! # Errors
//!
//! | Condition | Error |
//! |-----------|-------|
//! | HTTP 404 | [`PipelineError::SourceNotFound`] |
//! | HTTP 401/403, other non-2xx, network failure, bad JSON | [`PipelineError::SourceUnavailable`] |

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Config, TrackerConfig, GITLAB_MAX_PER_PAGE};
use crate::error::{PipelineError, PipelineResult};
use crate::models::IssueRecord;

/// Anything that can list all issues of a tracker group.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch the complete issue set for `group_id`, following the
    /// tracker's pagination to exhaustion.
    async fn fetch_all(&self, group_id: &str) -> PipelineResult<Vec<IssueRecord>>;
}

pub struct GitLabSource {
    base_url: String,
    token: String,
    per_page: u32,
    client: reqwest::Client,
}

impl GitLabSource {
    pub fn new(tracker: &TrackerConfig, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(tracker.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: tracker.url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            per_page: tracker.per_page,
            client,
        })
    }

    /// Build from the process config. Fails if `GITLAB_TOKEN` was not set.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.tracker, config.tracker_token()?)
    }

    async fn fetch_page(&self, group_id: &str, page: u32) -> PipelineResult<IssuePage> {
        let url = format!(
            "{}/api/v4/groups/{}/issues",
            self.base_url,
            encode_path_segment(group_id)
        );

        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .query(&[
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::source_unavailable(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::source_not_found(group_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::source_unavailable(format!(
                "GitLab API error {}: {}",
                status, body
            )));
        }

        let next_page = response
            .headers()
            .get("x-next-page")
            .map(|v| v.to_str().unwrap_or("").trim().parse::<u32>().ok());

        let issues: Vec<GitLabIssue> = response.json().await.map_err(|e| {
            PipelineError::source_unavailable(format!("invalid GitLab response: {}", e))
        })?;

        Ok(IssuePage { issues, next_page })
    }
}

#[async_trait]
impl IssueSource for GitLabSource {
    async fn fetch_all(&self, group_id: &str) -> PipelineResult<Vec<IssueRecord>> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.fetch_page(group_id, page).await?;
            let fetched = batch.issues.len();
            records.extend(batch.issues.into_iter().map(GitLabIssue::into_record));
            tracing::debug!(group_id, page, fetched, "fetched issue page");

            match next_page_after(page, fetched, self.per_page, batch.next_page) {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(records)
    }
}

struct IssuePage {
    issues: Vec<GitLabIssue>,
    /// `None` when the header is absent, `Some(None)` when present but empty.
    next_page: Option<Option<u32>>,
}

/// Decide which page to request next, or `None` to stop.
fn next_page_after(
    page: u32,
    fetched: usize,
    per_page: u32,
    header: Option<Option<u32>>,
) -> Option<u32> {
    if fetched == 0 {
        return None;
    }
    match header {
        Some(next) => next.filter(|n| *n > page),
        // GitLab serves at most GITLAB_MAX_PER_PAGE per page whatever was asked.
        None if fetched < per_page.min(GITLAB_MAX_PER_PAGE) as usize => None,
        None => Some(page + 1),
    }
}

#[derive(Debug, Deserialize)]
struct GitLabIssue {
    id: i64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    state: String,
    created_at: String,
    updated_at: String,
    author: GitLabAuthor,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabAuthor {
    name: String,
}

impl GitLabIssue {
    fn into_record(self) -> IssueRecord {
        IssueRecord {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            state: self.state,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author: self.author.name,
            labels: self.labels,
        }
    }
}

/// Percent-encode a group id or path for use as one URL path segment.
fn encode_path_segment(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
