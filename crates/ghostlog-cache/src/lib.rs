//! Content-addressable attachment cache for ghostlog
//!
//! This crate stores attachment bytes once per distinct SHA-256 digest under a
//! random stable filename, resolves attachment URLs through the fetcher into
//! those filenames, and computes which attachments an edit removed.

pub mod attachment;
pub mod cas;
pub mod delta;

// Re-export main types
pub use attachment::AttachmentCache;
pub use cas::{CacheEntry, CacheIndex, ContentHash, ContentStore};
pub use delta::{compute_delta, EditDelta, EditDeltaTracker};

use ghostlog_core::error::GhostlogError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, GhostlogError>;
