// src/lib.rs

//! bugsync - incremental Bugzilla synchronization engine.
//!
//! Discovers issues changed since the last successful run, fetches full
//! detail plus per-issue change history, and persists enough local state
//! to resume after a crash without re-downloading unchanged data.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
