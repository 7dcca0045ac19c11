//! Event handling
//!
//! Turns delete, edit and command events into audit records. Attachments are
//! resolved before anything is appended, so a record never carries a
//! half-finished reference list.

use std::sync::Arc;

use ghostlog_core::types::{AuditEvent, DeletionRecord, EditRecord, MessageSnapshot};
use tracing::{debug, info};

use crate::context::AuditContext;
use crate::export::ExportSummary;
use crate::AuditResult;

/// Message prefix that triggers a CSV export
pub const EXPORT_COMMAND: &str = "!csv";

/// Whether `message` asks for a CSV export
pub fn is_export_command(message: &MessageSnapshot) -> bool {
    message.content.starts_with(EXPORT_COMMAND)
}

/// What handling one event produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A deletion record was appended
    Deleted { entry_id: i64, attachments: usize },
    /// An edit record was appended
    Edited { entry_id: i64, removed: usize },
    /// The export command ran; `reply` is the acknowledgment text
    Exported { summary: ExportSummary, reply: String },
    /// Nothing to do
    Ignored,
}

/// Handles events against a shared context
#[derive(Debug, Clone)]
pub struct EventHandler {
    context: Arc<AuditContext>,
}

impl EventHandler {
    pub fn new(context: Arc<AuditContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<AuditContext> {
        &self.context
    }

    /// Dispatch one event
    pub async fn handle(&self, event: &AuditEvent) -> AuditResult<HandleOutcome> {
        debug!("Handling {} event for message {}", event.kind(), event.message_id());

        match event {
            AuditEvent::Delete { message } => {
                let entry_id = self.on_message_delete(message).await?;
                Ok(HandleOutcome::Deleted {
                    entry_id,
                    attachments: message.attachments.len(),
                })
            },
            AuditEvent::Edit { before, after } => {
                let (entry_id, removed) = self.record_edit(before, after).await?;
                Ok(HandleOutcome::Edited { entry_id, removed })
            },
            AuditEvent::Message { message } => match self.on_message(message)? {
                Some(summary) => {
                    let reply = summary.acknowledgment();
                    Ok(HandleOutcome::Exported { summary, reply })
                },
                None => Ok(HandleOutcome::Ignored),
            },
        }
    }

    /// Record a deleted message with its attachments
    pub async fn on_message_delete(&self, message: &MessageSnapshot) -> AuditResult<i64> {
        let log = self.context.deleted_log();
        log.upsert_user(&message.author)?;
        log.upsert_server(&message.server)?;

        let urls = message.attachment_urls();
        let refs = self.context.attachments().resolve_all(&urls).await;

        log.append_deletion(&DeletionRecord::new(message, refs))
    }

    /// Record an edit, including the attachments it removed
    pub async fn on_message_edit(
        &self,
        before: &MessageSnapshot,
        after: &MessageSnapshot,
    ) -> AuditResult<i64> {
        self.record_edit(before, after).await.map(|(entry_id, _)| entry_id)
    }

    async fn record_edit(
        &self,
        before: &MessageSnapshot,
        after: &MessageSnapshot,
    ) -> AuditResult<(i64, usize)> {
        let log = self.context.edited_log();
        log.upsert_user(&before.author)?;
        log.upsert_server(&before.server)?;

        let delta = self
            .context
            .delta_tracker()
            .track(&before.attachment_urls(), &after.attachment_urls())
            .await;
        let removed = delta.removed_urls.len();

        let record = EditRecord::new(
            before,
            after,
            delta.old_attachment_refs,
            delta.removed_attachment_refs,
        );
        let entry_id = log.append_edit(&record)?;
        Ok((entry_id, removed))
    }

    /// Run the export when the message is the export command
    pub fn on_message(&self, message: &MessageSnapshot) -> AuditResult<Option<ExportSummary>> {
        if !is_export_command(message) {
            return Ok(None);
        }

        info!(
            "Export requested by {} in channel {}",
            message.author.id, message.channel_id
        );
        self.context.export().map(Some)
    }
}
