//! The extract → stage → embed → upload driver.
//!
//! [`extract`] pulls every issue of a group and replaces the staging store.
//! [`index_staged`] then walks the store page by page:
//!
//! ```text
//! PAGING ──empty page──▶ DONE
//!   │
//!   ▼
//! EMBEDDING (one call per record, failures dropped)
//!   │
//!   ▼
//! UPLOADING (one call per page, skipped if nothing embedded)
//!   │
//!   └──offset += page_size──▶ PAGING
//! ```
//!
//! An empty page is the only way out of the loop. There is no
//! iteration cap; see the paging contract on [`IssueStore`].
//!
//! Everything runs sequentially: each embedding and upload call is awaited
//! before the next starts. At most one page of records and documents is
//! held in memory.

use std::num::NonZeroUsize;

use tracing::{debug, info, warn};

use crate::connector_gitlab::IssueSource;
use crate::embedding::Embedder;
use crate::error::PipelineResult;
use crate::models::EnrichedDocument;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::search_index::SearchIndex;
use crate::store::IssueStore;

/// Counters from one pass over the staging store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Non-empty pages read.
    pub pages: u64,
    pub records_read: u64,
    pub embedded: u64,
    /// Records whose embedding failed and were left out of the index.
    pub dropped: u64,
    pub upload_calls: u64,
    pub docs_succeeded: u64,
    pub docs_failed: u64,
}

/// Fetch all issues for `group_id` and replace the staging store with them.
///
/// Returns the number of records staged.
pub async fn extract(
    source: &dyn IssueSource,
    store: &dyn IssueStore,
    group_id: &str,
    progress: &dyn ProgressReporter,
) -> PipelineResult<usize> {
    progress.report(ProgressEvent::Fetching {
        group_id: group_id.to_string(),
    });
    let records = source.fetch_all(group_id).await?;
    info!(group_id, records = records.len(), "fetched issues");

    store.replace_all(&records).await?;
    progress.report(ProgressEvent::Staged {
        records: records.len() as u64,
    });
    Ok(records.len())
}

/// Embed every staged record and upload one batch per page.
///
/// Embedding failures drop the record and never abort the run. Store and
/// index errors are returned immediately; pages already uploaded stay
/// uploaded.
pub async fn index_staged(
    store: &dyn IssueStore,
    embedder: &dyn Embedder,
    index: &dyn SearchIndex,
    page_size: NonZeroUsize,
    progress: &dyn ProgressReporter,
) -> PipelineResult<IndexStats> {
    let page_size = page_size.get();
    let mut stats = IndexStats::default();
    let mut offset = 0usize;

    loop {
        let page = store.read_page(offset, page_size).await?;
        if page.is_empty() {
            debug!(offset, "empty page, done");
            break;
        }
        stats.pages += 1;
        stats.records_read += page.len() as u64;

        let mut batch = Vec::with_capacity(page.len());
        let mut dropped = 0u64;
        for record in &page {
            match embedder.embed(&record.content()).await {
                Ok(vector) => match EnrichedDocument::from_record(record, vector) {
                    Some(doc) => batch.push(doc),
                    None => {
                        warn!(id = record.id, "empty embedding, dropping record");
                        dropped += 1;
                    }
                },
                Err(e) => {
                    warn!(id = record.id, error = %e, "embedding failed, dropping record");
                    dropped += 1;
                }
            }
        }
        stats.embedded += batch.len() as u64;
        stats.dropped += dropped;

        let mut uploaded = 0u64;
        if !batch.is_empty() {
            let summary = index.upload(&batch).await?;
            stats.upload_calls += 1;
            stats.docs_succeeded += summary.succeeded as u64;
            stats.docs_failed += summary.failed as u64;
            uploaded = summary.succeeded as u64;
            for ack in summary.results.iter().filter(|a| !a.status) {
                warn!(
                    key = %ack.key,
                    status = ack.status_code,
                    error = ack.error_message.as_deref().unwrap_or(""),
                    "document rejected by index"
                );
            }
            info!(
                offset,
                documents = batch.len(),
                succeeded = summary.succeeded,
                "uploaded page"
            );
        }

        progress.report(ProgressEvent::Page {
            page: stats.pages,
            offset: offset as u64,
            records: page.len() as u64,
            uploaded,
            dropped,
        });

        offset = match offset.checked_add(page_size) {
            Some(next) => next,
            None => {
                debug!(offset, "offset space exhausted, done");
                break;
            }
        };
    }

    Ok(stats)
}

/// Full run: extract, then index.
pub async fn run(
    source: &dyn IssueSource,
    store: &dyn IssueStore,
    embedder: &dyn Embedder,
    index: &dyn SearchIndex,
    group_id: &str,
    page_size: NonZeroUsize,
    progress: &dyn ProgressReporter,
) -> PipelineResult<(usize, IndexStats)> {
    let staged = extract(source, store, group_id, progress).await?;
    let stats = index_staged(store, embedder, index, page_size, progress).await?;
    Ok((staged, stats))
}
