//! Core data types for the audit trail.
//!
//! This module provides the fundamental types used throughout ghostlog:
//! - Identity types for authors and servers
//! - Message snapshots and the events that carry them
//! - Audit records and resolved attachment references

pub mod identity;
pub mod message;
pub mod record;

// Re-export all public types
pub use identity::{Server, User};
pub use message::{Attachment, AuditEvent, MessageSnapshot};
pub use record::{
    join_refs, parse_refs, AttachmentRef, DeletionRecord, EditRecord, ABSENT_MARKER, REF_SEPARATOR,
};
