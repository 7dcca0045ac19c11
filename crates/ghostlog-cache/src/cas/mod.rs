//! Content-Addressable Storage implementation
//!
//! This module provides content hashing, the hash → filename index and the
//! on-disk store that writes each distinct content once.

pub mod hash;
pub mod index;
pub mod naming;
pub mod store;

// Re-export main types
pub use hash::{compute_hash, ContentHash};
pub use index::{CacheEntry, CacheIndex};
pub use naming::generate_filename;
pub use store::ContentStore;
