// src/storage/mod.rs

//! Durable state: the local raw-data cache and the external persistence
//! collaborator the orchestrator checkpoints into.

mod cache;

pub use cache::LocalCache;

use crate::error::Result;
use crate::models::IssueRecord;

/// External persistence collaborator.
///
/// Seeds the initial watermark and accepts per-batch checkpoints of built
/// records; the orchestrator is agnostic to where either ultimately lives.
pub trait StateStore {
    /// Last successfully synced timestamp for the given category and field,
    /// or `None` when nothing has been synced yet.
    fn get_last_date(&self, category: &str, field: &str) -> Result<Option<String>>;

    /// Persist a batch of built records. Called after every detail batch so
    /// a crash loses at most one unfinished batch.
    fn checkpoint(&mut self, records: &[IssueRecord]) -> Result<()>;
}

/// In-memory store for tests and runs without external persistence.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    pub last_date: Option<String>,
    pub records: Vec<IssueRecord>,
}

impl MemoryStateStore {
    pub fn with_last_date(last_date: impl Into<String>) -> Self {
        Self {
            last_date: Some(last_date.into()),
            records: Vec::new(),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn get_last_date(&self, _category: &str, _field: &str) -> Result<Option<String>> {
        Ok(self.last_date.clone())
    }

    fn checkpoint(&mut self, records: &[IssueRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}
