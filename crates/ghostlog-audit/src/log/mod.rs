//! SQLite audit logs
//!
//! Deletions and edits live in two independent databases. Each carries its own
//! copy of the `users` and `servers` dimension tables plus one append-only
//! record table. Records are never updated or deleted.

use std::path::Path;

use ghostlog_core::error::GhostlogError;
use ghostlog_core::types::{join_refs, parse_refs, DeletionRecord, EditRecord, Server, User};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::AuditResult;

/// Which audit log a database holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Deleted,
    Edited,
}

impl LogKind {
    /// Database file name inside the db directory
    pub fn db_file_name(self) -> &'static str {
        match self {
            LogKind::Deleted => "deleted_db.sqlite",
            LogKind::Edited => "edited_db.sqlite",
        }
    }

    /// Name of the record table
    pub fn table(self) -> &'static str {
        match self {
            LogKind::Deleted => "deleted_messages",
            LogKind::Edited => "edited_messages",
        }
    }

    fn record_schema(self) -> &'static str {
        match self {
            LogKind::Deleted => {
                "
                CREATE TABLE IF NOT EXISTS deleted_messages (
                    entry_id    INTEGER PRIMARY KEY AUTOINCREMENT,
                    id          TEXT,
                    content     TEXT,
                    author_id   TEXT,
                    server_id   TEXT,
                    channel_id  TEXT,
                    timestamp   TEXT,
                    attachments TEXT,
                    FOREIGN KEY (author_id) REFERENCES users (id),
                    FOREIGN KEY (server_id) REFERENCES servers (id)
                );
                "
            },
            LogKind::Edited => {
                "
                CREATE TABLE IF NOT EXISTS edited_messages (
                    entry_id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    id                 TEXT,
                    old_content        TEXT,
                    new_content        TEXT,
                    edit_timestamp     TEXT,
                    author_id          TEXT,
                    server_id          TEXT,
                    channel_id         TEXT,
                    attachments        TEXT,
                    attachment_removed TEXT,
                    FOREIGN KEY (author_id) REFERENCES users (id),
                    FOREIGN KEY (server_id) REFERENCES servers (id)
                );
                "
            },
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Deleted => write!(f, "deletion log"),
            LogKind::Edited => write!(f, "edit log"),
        }
    }
}

fn db_error(message: &str) -> impl FnOnce(rusqlite::Error) -> GhostlogError + '_ {
    move |e| GhostlogError::persistence(format!("{}: {}", message, e), e)
}

/// One audit database behind a serialized writer
#[derive(Debug)]
pub struct AuditLog {
    kind: LogKind,
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open (or create) the database at the given path
    pub fn open<P: AsRef<Path>>(path: P, kind: LogKind) -> AuditResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_error("Failed to open audit log"))?;
        let log = Self {
            kind,
            conn: Mutex::new(conn),
        };
        log.init()?;
        debug!("Opened {} at {}", kind, path.as_ref().display());
        Ok(log)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(kind: LogKind) -> AuditResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_error("Failed to open audit log"))?;
        let log = Self {
            kind,
            conn: Mutex::new(conn),
        };
        log.init()?;
        Ok(log)
    }

    fn init(&self) -> AuditResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(db_error("Failed to enable WAL"))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(db_error("Failed to enable foreign keys"))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS servers (
                id   TEXT PRIMARY KEY,
                name TEXT
            );
            CREATE TABLE IF NOT EXISTS users (
                id            TEXT PRIMARY KEY,
                username      TEXT,
                discriminator TEXT,
                profile_pic   TEXT
            );
            ",
        )
        .map_err(db_error("Failed to create dimension tables"))?;
        conn.execute_batch(self.kind.record_schema())
            .map_err(db_error("Failed to create record table"))
    }

    /// Which log this is
    pub fn kind(&self) -> LogKind {
        self.kind
    }

    /// Insert or refresh an author row; the latest values win
    pub fn upsert_user(&self, user: &User) -> AuditResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO users (id, username, discriminator, profile_pic)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    username = excluded.username,
                    discriminator = excluded.discriminator,
                    profile_pic = excluded.profile_pic",
                params![user.id, user.display_name, user.discriminator, user.avatar_url],
            )
            .map_err(db_error("Failed to upsert user"))?;
        Ok(())
    }

    /// Insert or refresh a server row; the latest name wins
    pub fn upsert_server(&self, server: &Server) -> AuditResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO servers (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![server.id, server.name],
            )
            .map_err(db_error("Failed to upsert server"))?;
        Ok(())
    }

    /// Look up an author row
    pub fn user(&self, id: &str) -> AuditResult<Option<User>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, username, discriminator, profile_pic FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        display_name: text(row, 1)?,
                        discriminator: text(row, 2)?,
                        avatar_url: text(row, 3)?,
                    })
                },
            )
            .optional()
            .map_err(db_error("Failed to look up user"))
    }

    /// Look up a server row
    pub fn server(&self, id: &str) -> AuditResult<Option<Server>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, name FROM servers WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Server {
                        id: row.get(0)?,
                        name: text(row, 1)?,
                    })
                },
            )
            .optional()
            .map_err(db_error("Failed to look up server"))
    }

    /// Append a deletion record and return its entry id
    pub fn append_deletion(&self, record: &DeletionRecord) -> AuditResult<i64> {
        self.expect_kind(LogKind::Deleted)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO deleted_messages
                (id, content, author_id, server_id, channel_id, timestamp, attachments)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.content,
                record.author_id,
                record.server_id,
                record.channel_id,
                record.timestamp,
                join_refs(&record.attachment_refs),
            ],
        )
        .map_err(db_error("Failed to append deletion"))?;

        let entry_id = conn.last_insert_rowid();
        info!(
            "Logged deletion of message {} as entry {} ({} attachments)",
            record.id,
            entry_id,
            record.attachment_refs.len()
        );
        Ok(entry_id)
    }

    /// Append an edit record and return its entry id
    pub fn append_edit(&self, record: &EditRecord) -> AuditResult<i64> {
        self.expect_kind(LogKind::Edited)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO edited_messages
                (id, old_content, new_content, edit_timestamp, author_id, server_id,
                 channel_id, attachments, attachment_removed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.old_content,
                record.new_content,
                record.edit_timestamp,
                record.author_id,
                record.server_id,
                record.channel_id,
                join_refs(&record.old_attachment_refs),
                join_refs(&record.removed_attachment_refs),
            ],
        )
        .map_err(db_error("Failed to append edit"))?;

        let entry_id = conn.last_insert_rowid();
        info!(
            "Logged edit of message {} as entry {} ({} attachments removed)",
            record.id,
            entry_id,
            record.removed_attachment_refs.len()
        );
        Ok(entry_id)
    }

    /// All deletion records in append order
    pub fn deletions(&self) -> AuditResult<Vec<DeletionRecord>> {
        self.expect_kind(LogKind::Deleted)?;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT entry_id, id, content, author_id, server_id, channel_id, timestamp, attachments
                 FROM deleted_messages ORDER BY entry_id",
            )
            .map_err(db_error("Failed to query deletions"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DeletionRecord {
                    entry_id: Some(row.get(0)?),
                    id: text(row, 1)?,
                    content: text(row, 2)?,
                    author_id: text(row, 3)?,
                    server_id: text(row, 4)?,
                    channel_id: text(row, 5)?,
                    timestamp: text(row, 6)?,
                    attachment_refs: parse_refs(&text(row, 7)?),
                })
            })
            .map_err(db_error("Failed to query deletions"))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to read deletion"))
    }

    /// All edit records in append order
    pub fn edits(&self) -> AuditResult<Vec<EditRecord>> {
        self.expect_kind(LogKind::Edited)?;

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT entry_id, id, old_content, new_content, edit_timestamp, author_id,
                        server_id, channel_id, attachments, attachment_removed
                 FROM edited_messages ORDER BY entry_id",
            )
            .map_err(db_error("Failed to query edits"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(EditRecord {
                    entry_id: Some(row.get(0)?),
                    id: text(row, 1)?,
                    old_content: text(row, 2)?,
                    new_content: text(row, 3)?,
                    edit_timestamp: text(row, 4)?,
                    author_id: text(row, 5)?,
                    server_id: text(row, 6)?,
                    channel_id: text(row, 7)?,
                    old_attachment_refs: parse_refs(&text(row, 8)?),
                    removed_attachment_refs: parse_refs(&text(row, 9)?),
                })
            })
            .map_err(db_error("Failed to query edits"))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(db_error("Failed to read edit"))
    }

    /// Number of records in this log
    pub fn record_count(&self) -> AuditResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.kind.table());
        self.conn
            .lock()
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .map_err(db_error("Failed to count records"))
    }

    /// Close the underlying connection
    pub fn close(self) -> AuditResult<()> {
        let kind = self.kind;
        self.conn.into_inner().close().map_err(|(_, e)| {
            GhostlogError::persistence(format!("Failed to close {}: {}", kind, e), e)
        })
    }

    fn expect_kind(&self, kind: LogKind) -> AuditResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(GhostlogError::Persistence {
                message: format!("Operation belongs to the {}, not the {}", kind, self.kind),
                source: None,
            })
        }
    }
}

/// Nullable text column as a string
fn text(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(index)?.unwrap_or_default())
}

/// Version of the linked SQLite library
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}

#[cfg(test)]
mod tests;
