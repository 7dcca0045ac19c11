//! JSON-lines event replay
//!
//! Reads one [`AuditEvent`] per line and feeds it to the [`EventHandler`].
//! Malformed lines and failed events are logged and counted; neither stops
//! the replay.

use ghostlog_core::error::GhostlogError;
use ghostlog_core::types::AuditEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::handler::{is_export_command, EventHandler, HandleOutcome};
use crate::AuditResult;

/// Totals of one replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub deleted: usize,
    pub edited: usize,
    pub exported: usize,
    pub ignored: usize,
    /// Events whose handling returned an error
    pub failed: usize,
    /// Lines that were not a valid event
    pub malformed: usize,
    /// Acknowledgments produced by export commands
    pub replies: Vec<String>,
}

impl IngestReport {
    /// Events handled successfully
    pub fn handled(&self) -> usize {
        self.deleted + self.edited + self.exported + self.ignored
    }

    fn record(&mut self, outcome: HandleOutcome) {
        match outcome {
            HandleOutcome::Deleted { .. } => self.deleted += 1,
            HandleOutcome::Edited { .. } => self.edited += 1,
            HandleOutcome::Exported { reply, .. } => {
                self.exported += 1;
                self.replies.push(reply);
            },
            HandleOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// Parse one line of the event feed; `line_number` is 1-based
pub fn parse_event_line(line_number: usize, line: &str) -> AuditResult<AuditEvent> {
    serde_json::from_str(line).map_err(|e| GhostlogError::EventParse {
        line: line_number,
        message: e.to_string(),
    })
}

/// Replays an event feed through a handler
#[derive(Debug, Clone)]
pub struct Ingestor {
    handler: EventHandler,
    max_in_flight: usize,
}

impl Ingestor {
    /// `max_in_flight` of 1 handles events strictly one after another
    pub fn new(handler: EventHandler, max_in_flight: usize) -> Self {
        Self {
            handler,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Read `reader` to the end, handling every event
    ///
    /// An export command waits for every earlier event to finish first, so
    /// its files include them. A read error stops the replay only after the
    /// events already started have been collected.
    pub async fn run<R>(&self, mut reader: R) -> AuditResult<IngestReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut report = IngestReport::default();
        let mut tasks: JoinSet<(usize, AuditResult<HandleOutcome>)> = JoinSet::new();
        let mut buf = Vec::new();
        let mut line_number: usize = 0;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {},
                Err(e) => {
                    drain(&mut tasks, &mut report).await;
                    return Err(GhostlogError::io("Failed to read event feed".to_string(), e));
                },
            }
            line_number += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(&['\n', '\r'][..]),
                Err(e) => {
                    warn!("Skipping line {}: not valid UTF-8 ({})", line_number, e);
                    report.malformed += 1;
                    continue;
                },
            };
            if line.trim().is_empty() {
                continue;
            }

            let event = match parse_event_line(line_number, line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping line {}: {}", line_number, e);
                    report.malformed += 1;
                    continue;
                },
            };

            let barrier = matches!(&event, AuditEvent::Message { message } if is_export_command(message));
            if barrier {
                drain(&mut tasks, &mut report).await;
            }
            while tasks.len() >= self.max_in_flight {
                if let Some(joined) = tasks.join_next().await {
                    collect(&mut report, joined);
                }
            }

            let handler = self.handler.clone();
            tasks.spawn(async move { (line_number, handler.handle(&event).await) });
        }

        drain(&mut tasks, &mut report).await;

        info!(
            "Replayed {} events ({} deleted, {} edited, {} failed, {} malformed)",
            report.handled() + report.failed,
            report.deleted,
            report.edited,
            report.failed,
            report.malformed
        );
        Ok(report)
    }
}

/// Wait for every running event
async fn drain(
    tasks: &mut JoinSet<(usize, AuditResult<HandleOutcome>)>,
    report: &mut IngestReport,
) {
    while let Some(joined) = tasks.join_next().await {
        collect(report, joined);
    }
}

fn collect(
    report: &mut IngestReport,
    joined: Result<(usize, AuditResult<HandleOutcome>), tokio::task::JoinError>,
) {
    match joined {
        Ok((_, Ok(outcome))) => report.record(outcome),
        Ok((line, Err(e))) => {
            error!("Dropped event from line {}: {}", line, e);
            report.failed += 1;
        },
        Err(e) => {
            error!("Event task panicked: {}", e);
            report.failed += 1;
        },
    }
}
