// src/services/mod.rs

//! Tracker-facing services: version probing, list discovery, detail
//! batches, record building and change-history parsing.

mod batch;
mod builder;
mod changes;
mod dialect;
mod listing;
mod version;

pub use batch::BatchFetcher;
pub use builder::IssueRecordBuilder;
pub use changes::{ChangeAliases, ChangeHistoryParser};
pub use dialect::Dialect;
pub use listing::{ListFetcher, ListPage};
pub use version::probe_version;
