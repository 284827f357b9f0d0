// src/models/mod.rs

//! Domain models for the sync engine.

mod issue;

pub use issue::{Change, IssueRecord};
