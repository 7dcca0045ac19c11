//! Audit records and resolved attachment references.
//!
//! Records are immutable once appended. Attachment references are stored in
//! the audit logs as a single text column; `join_refs` and `parse_refs` define
//! that encoding.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::MessageSnapshot;

/// Separator between references in a persisted attachment column
pub const REF_SEPARATOR: &str = ", ";

/// Persisted stand-in for an attachment that could not be cached
///
/// Stored filenames are alphanumeric with dots, so this never collides.
pub const ABSENT_MARKER: &str = "-";

/// Result of resolving one attachment URL through the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "file", rename_all = "snake_case")]
pub enum AttachmentRef {
    /// Content is cached under this filename
    Stored(String),
    /// Fetch or store failed
    Absent,
}

impl AttachmentRef {
    /// Stored filename, if any
    pub fn filename(&self) -> Option<&str> {
        match self {
            AttachmentRef::Stored(name) => Some(name),
            AttachmentRef::Absent => None,
        }
    }

    /// Check if the attachment was cached
    pub fn is_stored(&self) -> bool {
        matches!(self, AttachmentRef::Stored(_))
    }

    fn as_column_token(&self) -> &str {
        self.filename().unwrap_or(ABSENT_MARKER)
    }
}

impl From<Option<String>> for AttachmentRef {
    fn from(value: Option<String>) -> Self {
        value.map_or(AttachmentRef::Absent, AttachmentRef::Stored)
    }
}

/// Encode references for a persisted attachment column
pub fn join_refs(refs: &[AttachmentRef]) -> String {
    refs.iter()
        .map(AttachmentRef::as_column_token)
        .collect::<Vec<_>>()
        .join(REF_SEPARATOR)
}

/// Decode a persisted attachment column
pub fn parse_refs(column: &str) -> Vec<AttachmentRef> {
    if column.trim().is_empty() {
        return Vec::new();
    }

    column
        .split(REF_SEPARATOR.trim())
        .map(str::trim)
        .map(|token| {
            if token == ABSENT_MARKER || token.is_empty() {
                AttachmentRef::Absent
            } else {
                AttachmentRef::Stored(token.to_string())
            }
        })
        .collect()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// A deleted message as appended to the deletion log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Sequence id assigned by the log; `None` until appended
    pub entry_id: Option<i64>,
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub server_id: String,
    pub channel_id: String,
    pub timestamp: String,
    pub attachment_refs: Vec<AttachmentRef>,
}

impl DeletionRecord {
    /// Build a record for a deleted message, stamped with the current time
    pub fn new(message: &MessageSnapshot, attachment_refs: Vec<AttachmentRef>) -> Self {
        Self {
            entry_id: None,
            id: message.id.clone(),
            content: message.content.clone(),
            author_id: message.author.id.clone(),
            server_id: message.server.id.clone(),
            channel_id: message.channel_id.clone(),
            timestamp: now_timestamp(),
            attachment_refs,
        }
    }
}

/// An edited message as appended to the edit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    /// Sequence id assigned by the log; `None` until appended
    pub entry_id: Option<i64>,
    pub id: String,
    pub old_content: String,
    pub new_content: String,
    pub edit_timestamp: String,
    pub author_id: String,
    pub server_id: String,
    pub channel_id: String,
    /// Every attachment present before the edit
    pub old_attachment_refs: Vec<AttachmentRef>,
    /// Attachments present before and absent after; overlaps `old_attachment_refs`
    pub removed_attachment_refs: Vec<AttachmentRef>,
}

impl EditRecord {
    /// Build a record for an edit, attributing it to the `before` revision
    pub fn new(
        before: &MessageSnapshot,
        after: &MessageSnapshot,
        old_attachment_refs: Vec<AttachmentRef>,
        removed_attachment_refs: Vec<AttachmentRef>,
    ) -> Self {
        Self {
            entry_id: None,
            id: before.id.clone(),
            old_content: before.content.clone(),
            new_content: after.content.clone(),
            edit_timestamp: now_timestamp(),
            author_id: before.author.id.clone(),
            server_id: before.server.id.clone(),
            channel_id: before.channel_id.clone(),
            old_attachment_refs,
            removed_attachment_refs,
        }
    }
}
