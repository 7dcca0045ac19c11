//! # ghostlog-core
//!
//! Core types and utilities shared across all ghostlog crates.
//!
//! This crate provides:
//! - Identity and message snapshot types delivered by the event source
//! - Audit record types (deletions, edits) and resolved attachment references
//! - GhostlogError enum for unified error handling
//! - URL and path helpers used by the attachment cache
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (User, MessageSnapshot, DeletionRecord, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{GhostlogError, GhostlogResult};
pub use types::{
    Attachment, AttachmentRef, AuditEvent, DeletionRecord, EditRecord, MessageSnapshot, Server,
    User,
};
