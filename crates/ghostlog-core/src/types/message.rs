//! Message snapshots and the events that carry them.

use serde::{Deserialize, Serialize};

use super::{Server, User};

/// An attachment referenced by a message
///
/// The URL is transient and usually carries an expiring signature in its
/// query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}

/// A message as observed at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: User,
    pub server: Server,
    pub channel_id: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageSnapshot {
    /// Attachment URLs in message order
    pub fn attachment_urls(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.url.clone()).collect()
    }
}

/// A notification delivered by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A message was deleted
    Delete { message: MessageSnapshot },
    /// A message was edited
    Edit {
        before: MessageSnapshot,
        after: MessageSnapshot,
    },
    /// A message was posted; only inspected for in-band commands
    Message { message: MessageSnapshot },
}

impl AuditEvent {
    /// Id of the message this event concerns
    pub fn message_id(&self) -> &str {
        match self {
            AuditEvent::Delete { message } | AuditEvent::Message { message } => &message.id,
            AuditEvent::Edit { before, .. } => &before.id,
        }
    }

    /// Short event name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::Delete { .. } => "delete",
            AuditEvent::Edit { .. } => "edit",
            AuditEvent::Message { .. } => "message",
        }
    }
}
