//! In-memory [`IssueStore`] for tests and embedding the pipeline.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{PipelineError, PipelineResult};
use crate::models::IssueRecord;

use super::IssueStore;

/// Records held in insertion order behind a lock.
pub struct MemoryIssueStore {
    records: RwLock<Vec<IssueRecord>>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryIssueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn replace_all(&self, records: &[IssueRecord]) -> PipelineResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| PipelineError::store_io("staging lock poisoned"))?;
        *guard = records.to_vec();
        Ok(())
    }

    async fn read_page(&self, offset: usize, limit: usize) -> PipelineResult<Vec<IssueRecord>> {
        let guard = self
            .records
            .read()
            .map_err(|_| PipelineError::store_io("staging lock poisoned"))?;
        Ok(guard.iter().skip(offset).take(limit).cloned().collect())
    }
}
