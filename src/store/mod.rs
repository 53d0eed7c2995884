//! Staging store for normalized issues.
//!
//! The [`IssueStore`] trait is the only storage surface the pipeline sees:
//! a whole-table replace and a limit/offset page read. Two backends ship:
//!
//! - [`SqliteIssueStore`] — the durable staging table used by `issx`.
//! - [`MemoryIssueStore`] — a `Vec` behind a lock, for tests and callers
//!   that embed the pipeline.
//!
//! # Concurrency
//!
//! A store is written once per run, before any page is read. Two runs
//! sharing one staging table are not safe: the replace at the start of one
//! run can interleave with the page reads of another. Serialize runs
//! outside the process (a lock file or single-instance scheduling).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::PipelineResult;
use crate::models::IssueRecord;

pub use memory::MemoryIssueStore;
pub use sqlite::SqliteIssueStore;

/// Durable staging for one extraction run.
///
/// # Paging contract
///
/// `read_page` returns records in a stable order that does not change
/// between calls within a run. For any offset at or past the number of
/// stored records it returns an empty vector, and callers stop on that
/// empty page alone. An implementation must therefore eventually return
/// an empty page as the offset grows; one that never does makes the
/// pipeline loop forever.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Discard all prior contents and store `records` in their given order.
    ///
    /// From the caller's view the swap is atomic: on error the previous
    /// contents are still in place.
    async fn replace_all(&self, records: &[IssueRecord]) -> PipelineResult<()>;

    /// Read at most `limit` records starting at `offset`.
    async fn read_page(&self, offset: usize, limit: usize) -> PipelineResult<Vec<IssueRecord>>;
}

/// SHA-256 over records in order, hex-encoded.
///
/// Each field is length-prefixed so that shifting text between adjacent
/// fields changes the digest.
pub fn fingerprint(records: &[IssueRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        update_record(&mut hasher, record);
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint everything in a store by paging through it.
pub async fn fingerprint_store(
    store: &dyn IssueStore,
    page_size: usize,
) -> PipelineResult<(usize, String)> {
    let mut hasher = Sha256::new();
    let mut offset = 0;
    let mut count = 0;
    loop {
        let page = store.read_page(offset, page_size).await?;
        if page.is_empty() {
            break;
        }
        for record in &page {
            update_record(&mut hasher, record);
        }
        count += page.len();
        offset = match offset.checked_add(page_size) {
            Some(next) => next,
            None => break,
        };
    }
    Ok((count, format!("{:x}", hasher.finalize())))
}

fn update_record(hasher: &mut Sha256, record: &IssueRecord) {
    hasher.update(record.id.to_le_bytes());
    let labels = record.labels_joined();
    for field in [
        record.title.as_str(),
        record.description.as_str(),
        record.state.as_str(),
        record.created_at.as_str(),
        record.updated_at.as_str(),
        record.author.as_str(),
        labels.as_str(),
    ] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::IssueRecord;

    pub fn issue(id: i64) -> IssueRecord {
        IssueRecord {
            id,
            title: format!("Issue {}", id),
            description: format!("Body of issue {}", id),
            state: if id % 2 == 0 { "closed" } else { "opened" }.to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-02T00:00:00.000Z".to_string(),
            author: "Grace Hopper".to_string(),
            labels: vec!["bug".to_string(), format!("p{}", id)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::issue;
    use super::*;

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = fingerprint(&[issue(1), issue(2)]);
        let b = fingerprint(&[issue(2), issue(1)]);
        assert_ne!(a, b);
        assert_eq!(a, fingerprint(&[issue(1), issue(2)]));
    }

    #[test]
    fn fingerprint_separates_fields() {
        let mut x = issue(1);
        x.title = "ab".to_string();
        x.description = "c".to_string();
        let mut y = issue(1);
        y.title = "a".to_string();
        y.description = "bc".to_string();
        assert_ne!(fingerprint(&[x]), fingerprint(&[y]));
    }

    #[tokio::test]
    async fn fingerprint_store_matches_slice_fingerprint() {
        let store = MemoryIssueStore::new();
        let records: Vec<_> = (1..=5).map(issue).collect();
        store.replace_all(&records).await.unwrap();

        let (count, digest) = fingerprint_store(&store, 2).await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(digest, fingerprint(&records));
    }
}
