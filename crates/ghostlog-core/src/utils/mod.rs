//! Utility functions and helpers.
//!
//! Common functionality used across multiple ghostlog crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{extension_from_url, is_safe_path, safe_join};
