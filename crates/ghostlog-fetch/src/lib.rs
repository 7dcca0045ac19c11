//! Attachment fetcher for ghostlog
//!
//! This crate retrieves raw attachment bytes over HTTP under a fixed
//! concurrency ceiling. A failed fetch is reported as absent content, never as
//! an error that would abort the event it belongs to.

pub mod client;
pub mod memory;

// Re-export main types
pub use client::{Fetch, FetchConfig, HttpFetcher};
pub use memory::MemoryFetcher;

use ghostlog_core::error::GhostlogError;

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, GhostlogError>;
