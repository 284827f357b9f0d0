// src/utils/mod.rs

//! Shared utilities.

pub mod http;
pub mod time;
pub mod url;
