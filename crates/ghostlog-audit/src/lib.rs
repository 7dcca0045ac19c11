//! Audit trail for deleted and edited messages
//!
//! This crate owns the two SQLite audit logs, the context object that wires
//! them to the attachment cache, the event handler, the CSV exporter and the
//! JSON-lines replay used by the command line.

pub mod context;
pub mod export;
pub mod handler;
pub mod ingest;
pub mod log;

// Re-export main types
pub use context::{AuditContext, AuditStats};
pub use export::{ExportSummary, ExportedFile, Exporter};
pub use handler::{is_export_command, EventHandler, HandleOutcome, EXPORT_COMMAND};
pub use ingest::{parse_event_line, IngestReport, Ingestor};
pub use log::{sqlite_version, AuditLog, LogKind};

use ghostlog_core::error::GhostlogError;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, GhostlogError>;
