// src/pipeline/mod.rs

//! End-to-end synchronization pipeline.

mod cursor;
mod sync;

pub use cursor::IncrementalCursor;
pub use sync::SyncOrchestrator;
