//! Incremental watermark cursor.

use crate::config::DetailLevel;
use crate::error::{AppError, Result};
use crate::storage::StateStore;
use crate::utils::time::parse_timestamp;

/// Tracks the "last seen change timestamp" watermark bounding the next
/// list query. Monotonically non-decreasing across the run; advanced only
/// after a list page has been successfully parsed and cached.
#[derive(Debug)]
pub struct IncrementalCursor {
    watermark: Option<String>,
}

impl IncrementalCursor {
    /// Seed the watermark from the external state store.
    ///
    /// `None` means no previous sync exists: fetch from the beginning of
    /// time. A non-incremental run always starts unseeded.
    pub fn initial<S: StateStore + ?Sized>(
        store: &S,
        detail: DetailLevel,
        incremental: bool,
    ) -> Result<Self> {
        if !incremental {
            return Ok(Self { watermark: None });
        }

        let field = match detail {
            DetailLevel::List => "changeddate_date",
            _ => "delta_ts_date",
        };
        let watermark = store.get_last_date("state", field)?;
        Ok(Self { watermark })
    }

    /// A cursor at a fixed position.
    pub fn at(watermark: Option<String>) -> Self {
        Self { watermark }
    }

    /// The current watermark, if any.
    pub fn value(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    /// Advance the watermark to a list page's last-row timestamp.
    ///
    /// A value that does not parse as a timestamp is fatal: a corrupt
    /// watermark must not silently reset synchronization to epoch.
    pub fn advance(&mut self, timestamp: &str) -> Result<()> {
        if parse_timestamp(timestamp).is_none() {
            log::error!("Refusing to advance watermark to unparseable '{timestamp}'");
            return Err(AppError::watermark(timestamp));
        }
        self.watermark = Some(timestamp.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStateStore;

    #[test]
    fn initial_reads_store_when_incremental() {
        let store = MemoryStateStore::with_last_date("2020-01-01T10:00:00");
        let cursor = IncrementalCursor::initial(&store, DetailLevel::Change, true).unwrap();
        assert_eq!(cursor.value(), Some("2020-01-01T10:00:00"));
    }

    #[test]
    fn initial_is_unseeded_when_not_incremental() {
        let store = MemoryStateStore::with_last_date("2020-01-01T10:00:00");
        let cursor = IncrementalCursor::initial(&store, DetailLevel::Change, false).unwrap();
        assert_eq!(cursor.value(), None);
    }

    #[test]
    fn advance_accepts_valid_timestamp() {
        let mut cursor = IncrementalCursor::at(None);
        cursor.advance("2020-01-02 11:00:00").unwrap();
        assert_eq!(cursor.value(), Some("2020-01-02 11:00:00"));
    }

    #[test]
    fn advance_rejects_garbage() {
        let mut cursor = IncrementalCursor::at(Some("2020-01-01 10:00:00".to_string()));
        assert!(cursor.advance("last tuesday").is_err());
        // Watermark untouched after the failed advance.
        assert_eq!(cursor.value(), Some("2020-01-01 10:00:00"));
    }
}
