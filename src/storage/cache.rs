//! Local filesystem cache for raw tracker data.
//!
//! Two independent on-disk structures:
//!
//! - one write-once file per issue id holding the raw XML and HTML that
//!   built it (`cache_issue_<id>.json`), so a crashed run can rebuild
//!   issues without refetching;
//! - one append-only JSON array of list pages
//!   (`cache_issues_list_csv.json`), appended without ever loading the
//!   whole file: drop the trailing close bracket, write a comma-separated
//!   entry, re-close.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::IssueRecord;
use crate::services::IssueRecordBuilder;

const LIST_CACHE_FILE: &str = "cache_issues_list_csv.json";
const ISSUE_FILE_PREFIX: &str = "cache_issue_";

/// Cached raw data for one issue.
#[derive(Debug, Serialize, Deserialize)]
struct IssueCacheEntry {
    issue_id: String,
    xml: String,
    html: Option<String>,
}

/// One cached CSV list page plus the watermark value it produced.
#[derive(Debug, Serialize, Deserialize)]
struct ListPageCacheEntry {
    last_update: String,
    csv: Vec<String>,
}

/// Durable per-run storage rooted at a cache directory.
pub struct LocalCache {
    dir: PathBuf,
    finalized: bool,
}

impl LocalCache {
    /// Create a cache handle rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            finalized: false,
        }
    }

    /// Ensure the cache directory and list-page cache exist.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.list_cache_path();
        if !path.exists() {
            fs::write(&path, b"[]")?;
        }
        Ok(())
    }

    /// Start-of-run reset for a fresh, non-incremental sync: delete every
    /// per-issue file and re-initialize the list-page cache.
    pub fn clean(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(ISSUE_FILE_PREFIX) && name.ends_with(".json") {
                fs::remove_file(entry.path())?;
            }
        }
        fs::write(self.list_cache_path(), b"[]")?;
        self.finalized = false;
        Ok(())
    }

    /// Write one issue's raw data. Write-once: an existing entry is never
    /// updated in place.
    pub fn write_issue(&self, issue_id: &str, xml: &str, html: Option<&str>) -> Result<()> {
        let path = self.issue_path(issue_id);
        if path.exists() {
            return Ok(());
        }
        let entry = IssueCacheEntry {
            issue_id: issue_id.to_string(),
            xml: xml.to_string(),
            html: html.map(str::to_string),
        };
        fs::write(&path, serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Append one list page to the list-page cache.
    pub fn append_list_page(&self, last_update: &str, lines: &[String]) -> Result<()> {
        let path = self.list_cache_path();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        let first = if len == 0 {
            file.write_all(b"[")?;
            true
        } else {
            file.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            if last[0] != b']' {
                return Err(AppError::cache(format!(
                    "list cache {path:?} is not a closed JSON array"
                )));
            }
            file.set_len(len - 1)?;
            file.seek(SeekFrom::End(0))?;
            len == 2
        };

        if !first {
            file.write_all(b",")?;
        }
        let entry = ListPageCacheEntry {
            last_update: last_update.to_string(),
            csv: lines.to_vec(),
        };
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.write_all(b"]")?;
        Ok(())
    }

    /// End-of-run cleanup, exactly once: strip a dangling separator and
    /// close the array so the file parses no matter how many pages were
    /// appended, including zero.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let path = self.list_cache_path();
        if !path.exists() {
            fs::write(&path, b"[]")?;
            return Ok(());
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(b"[]")?;
            return Ok(());
        }

        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        match last[0] {
            b']' => {}
            b',' => {
                file.set_len(len - 1)?;
                file.seek(SeekFrom::End(0))?;
                file.write_all(b"]")?;
            }
            _ => {
                file.seek(SeekFrom::End(0))?;
                file.write_all(b"]")?;
            }
        }
        Ok(())
    }

    /// Rebuild every cached issue without touching the network.
    ///
    /// Returns the (unordered) set of records; replay neither reads nor
    /// advances the watermark.
    pub fn replay(&self, builder: &IssueRecordBuilder) -> Result<Vec<IssueRecord>> {
        log::info!("Reading issues from cache");
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(ISSUE_FILE_PREFIX) || !name.ends_with(".json") {
                continue;
            }

            let content = fs::read_to_string(entry.path())?;
            let cached: IssueCacheEntry = serde_json::from_str(&content)?;
            let doc = roxmltree::Document::parse(&cached.xml)?;
            let record = builder.build(None, Some(doc.root_element()), cached.html.as_deref())?;
            records.push(record);
        }

        log::debug!("Total issues in cache: {}", records.len());
        Ok(records)
    }

    /// Fetch one issue's cached change-history HTML, if present.
    pub fn cached_changes(&self, issue_id: &str) -> Option<String> {
        let content = fs::read_to_string(self.issue_path(issue_id)).ok()?;
        let cached: IssueCacheEntry = serde_json::from_str(&content).ok()?;
        cached.html
    }

    fn list_cache_path(&self) -> PathBuf {
        self.dir.join(LIST_CACHE_FILE)
    }

    fn issue_path(&self, issue_id: &str) -> PathBuf {
        self.dir.join(format!("{ISSUE_FILE_PREFIX}{issue_id}.json"))
    }
}
