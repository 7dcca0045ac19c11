//! CSV export of the audit logs and the cache index
//!
//! Files are written in a fixed order: deletions, edits, cache. A failure
//! stops the export; files already written stay in place.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use ghostlog_cache::CacheIndex;
use ghostlog_core::error::GhostlogError;
use ghostlog_core::types::join_refs;
use serde::Serialize;
use tracing::{error, info};

use crate::log::AuditLog;
use crate::AuditResult;

pub const DELETED_CSV: &str = "deleted_db.csv";
pub const EDITED_CSV: &str = "edited_db.csv";
pub const CACHE_CSV: &str = "cache_db.csv";

const DELETED_HEADER: [&str; 8] = [
    "entry_id",
    "id",
    "content",
    "author_id",
    "server_id",
    "channel_id",
    "timestamp",
    "attachments",
];

const EDITED_HEADER: [&str; 10] = [
    "entry_id",
    "id",
    "old_content",
    "new_content",
    "edit_timestamp",
    "author_id",
    "server_id",
    "channel_id",
    "attachments",
    "attachment_removed",
];

const CACHE_HEADER: [&str; 3] = ["url", "attachment_hash", "file"];

#[derive(Serialize)]
struct DeletedRow<'a> {
    entry_id: Option<i64>,
    id: &'a str,
    content: &'a str,
    author_id: &'a str,
    server_id: &'a str,
    channel_id: &'a str,
    timestamp: &'a str,
    attachments: String,
}

#[derive(Serialize)]
struct EditedRow<'a> {
    entry_id: Option<i64>,
    id: &'a str,
    old_content: &'a str,
    new_content: &'a str,
    edit_timestamp: &'a str,
    author_id: &'a str,
    server_id: &'a str,
    channel_id: &'a str,
    attachments: String,
    attachment_removed: String,
}

#[derive(Serialize)]
struct CacheRow<'a> {
    url: &'a str,
    attachment_hash: String,
    file: &'a str,
}

/// One written CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: Utf8PathBuf,
    /// Data rows, header excluded
    pub rows: usize,
}

/// Result of a full export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub deleted: ExportedFile,
    pub edited: ExportedFile,
    pub cache: ExportedFile,
}

impl ExportSummary {
    /// Files in the order they were written
    pub fn files(&self) -> [&ExportedFile; 3] {
        [&self.deleted, &self.edited, &self.cache]
    }

    /// Reply sent for the in-band export command
    pub fn acknowledgment(&self) -> String {
        format!(
            "Databases have been exported to `{}`, `{}`, and `{}`.",
            self.deleted.path, self.edited.path, self.cache.path
        )
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, file) in self.files().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} ({} rows)", file.path, file.rows)?;
        }
        Ok(())
    }
}

/// Writes the three stores to CSV
#[derive(Debug, Clone, Copy)]
pub struct Exporter<'a> {
    deleted: &'a AuditLog,
    edited: &'a AuditLog,
    cache: &'a CacheIndex,
}

impl<'a> Exporter<'a> {
    pub fn new(deleted: &'a AuditLog, edited: &'a AuditLog, cache: &'a CacheIndex) -> Self {
        Self {
            deleted,
            edited,
            cache,
        }
    }

    /// Export everything into `csv_dir`
    pub fn export_all(&self, csv_dir: &Utf8Path) -> AuditResult<ExportSummary> {
        std::fs::create_dir_all(csv_dir)
            .map_err(|e| GhostlogError::io(format!("Failed to create {}", csv_dir), e))?;

        let result = self.write_all(csv_dir);
        match &result {
            Ok(summary) => info!(
                "Exported audit trail to {} ({} deletions, {} edits, {} cache entries)",
                csv_dir, summary.deleted.rows, summary.edited.rows, summary.cache.rows
            ),
            Err(e) => error!("Export to {} failed: {}", csv_dir, e),
        }
        result
    }

    fn write_all(&self, csv_dir: &Utf8Path) -> AuditResult<ExportSummary> {
        let deleted = self.export_deletions(&csv_dir.join(DELETED_CSV))?;
        let edited = self.export_edits(&csv_dir.join(EDITED_CSV))?;
        let cache = self.export_cache(&csv_dir.join(CACHE_CSV))?;

        Ok(ExportSummary {
            deleted,
            edited,
            cache,
        })
    }

    /// Write `deleted_db.csv`
    pub fn export_deletions(&self, path: &Utf8Path) -> AuditResult<ExportedFile> {
        let records = self.deleted.deletions()?;
        let rows = records.iter().map(|record| DeletedRow {
            entry_id: record.entry_id,
            id: &record.id,
            content: &record.content,
            author_id: &record.author_id,
            server_id: &record.server_id,
            channel_id: &record.channel_id,
            timestamp: &record.timestamp,
            attachments: join_refs(&record.attachment_refs),
        });

        write_csv(path, &DELETED_HEADER, rows)
    }

    /// Write `edited_db.csv`
    pub fn export_edits(&self, path: &Utf8Path) -> AuditResult<ExportedFile> {
        let records = self.edited.edits()?;
        let rows = records.iter().map(|record| EditedRow {
            entry_id: record.entry_id,
            id: &record.id,
            old_content: &record.old_content,
            new_content: &record.new_content,
            edit_timestamp: &record.edit_timestamp,
            author_id: &record.author_id,
            server_id: &record.server_id,
            channel_id: &record.channel_id,
            attachments: join_refs(&record.old_attachment_refs),
            attachment_removed: join_refs(&record.removed_attachment_refs),
        });

        write_csv(path, &EDITED_HEADER, rows)
    }

    /// Write `cache_db.csv`
    pub fn export_cache(&self, path: &Utf8Path) -> AuditResult<ExportedFile> {
        let entries = self.cache.entries()?;
        let rows = entries.iter().map(|entry| CacheRow {
            url: &entry.source_url,
            attachment_hash: entry.hash.to_hex(),
            file: &entry.stored_filename,
        });

        write_csv(path, &CACHE_HEADER, rows)
    }
}

/// Write a header and one line per row; the header is written even with no rows
fn write_csv<R, I>(path: &Utf8Path, header: &[&str], rows: I) -> AuditResult<ExportedFile>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let export_error = |e: csv::Error| GhostlogError::Export {
        file: path.to_string(),
        message: e.to_string(),
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(export_error)?;

    writer.write_record(header).map_err(export_error)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row).map_err(export_error)?;
        count += 1;
    }

    writer.flush().map_err(|e| GhostlogError::Export {
        file: path.to_string(),
        message: e.to_string(),
    })?;

    info!("Exported {} rows to {}", count, path);
    Ok(ExportedFile {
        path: path.to_path_buf(),
        rows: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogKind;
    use ghostlog_cache::cas::{compute_hash, CacheEntry};
    use ghostlog_core::types::{AttachmentRef, DeletionRecord, EditRecord, MessageSnapshot, Server, User};
    use tempfile::tempdir;

    fn snapshot(id: &str, content: &str) -> MessageSnapshot {
        MessageSnapshot {
            id: id.to_string(),
            content: content.to_string(),
            author: User::new("7", "ann"),
            server: Server::new("9", "guild"),
            channel_id: "3".to_string(),
            attachments: Vec::new(),
        }
    }

    fn logs() -> (AuditLog, AuditLog, CacheIndex) {
        let deleted = AuditLog::open_in_memory(LogKind::Deleted).unwrap();
        let edited = AuditLog::open_in_memory(LogKind::Edited).unwrap();
        for log in [&deleted, &edited] {
            log.upsert_user(&User::new("7", "ann")).unwrap();
            log.upsert_server(&Server::new("9", "guild")).unwrap();
        }
        (deleted, edited, CacheIndex::open_in_memory().unwrap())
    }

    fn csv_dir(temp_dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp_dir.path().join("csv")).unwrap()
    }

    fn read_rows(path: &Utf8Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let header = reader.headers().unwrap().clone();
        let rows = reader.records().map(Result::unwrap).collect();
        (header, rows)
    }

    #[test]
    fn test_empty_export_writes_headers() {
        let (deleted, edited, cache) = logs();
        let temp_dir = tempdir().unwrap();
        let dir = csv_dir(&temp_dir);

        let summary = Exporter::new(&deleted, &edited, &cache).export_all(&dir).unwrap();

        assert!(summary.files().iter().all(|file| file.rows == 0));
        let (header, rows) = read_rows(&summary.deleted.path);
        assert_eq!(header, csv::StringRecord::from(DELETED_HEADER.to_vec()));
        assert!(rows.is_empty());
        let (header, _) = read_rows(&summary.edited.path);
        assert_eq!(header, csv::StringRecord::from(EDITED_HEADER.to_vec()));
        let (header, _) = read_rows(&summary.cache.path);
        assert_eq!(header, csv::StringRecord::from(CACHE_HEADER.to_vec()));
    }

    #[test]
    fn test_export_row_counts_and_columns() {
        let (deleted, edited, cache) = logs();
        for i in 0..3 {
            deleted
                .append_deletion(&DeletionRecord::new(
                    &snapshot(&i.to_string(), "comma, \"quoted\""),
                    vec![AttachmentRef::Stored("aaaaaaaaaaaa.png.cache".into()), AttachmentRef::Absent],
                ))
                .unwrap();
        }
        edited
            .append_edit(&EditRecord::new(
                &snapshot("5", "old"),
                &snapshot("5", "new"),
                vec![AttachmentRef::Stored("bbbbbbbbbbbb.jpg.cache".into())],
                vec![AttachmentRef::Stored("bbbbbbbbbbbb.jpg.cache".into())],
            ))
            .unwrap();
        let hash = compute_hash(b"bytes");
        cache
            .insert(&CacheEntry::new("https://cdn/a.png", hash, "aaaaaaaaaaaa.png.cache"))
            .unwrap();

        let temp_dir = tempdir().unwrap();
        let summary = Exporter::new(&deleted, &edited, &cache)
            .export_all(&csv_dir(&temp_dir))
            .unwrap();

        assert_eq!(summary.deleted.rows, 3);
        assert_eq!(summary.edited.rows, 1);
        assert_eq!(summary.cache.rows, 1);

        let (_, rows) = read_rows(&summary.deleted.path);
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][2], "comma, \"quoted\"");
        assert_eq!(&rows[0][7], "aaaaaaaaaaaa.png.cache, -");

        let (_, rows) = read_rows(&summary.edited.path);
        assert_eq!(&rows[0][2], "old");
        assert_eq!(&rows[0][3], "new");
        assert_eq!(&rows[0][9], "bbbbbbbbbbbb.jpg.cache");

        let (_, rows) = read_rows(&summary.cache.path);
        assert_eq!(&rows[0][1], hash.to_hex());
    }

    #[test]
    fn test_acknowledgment_names_all_files() {
        let (deleted, edited, cache) = logs();
        let temp_dir = tempdir().unwrap();
        let summary = Exporter::new(&deleted, &edited, &cache)
            .export_all(&csv_dir(&temp_dir))
            .unwrap();

        let ack = summary.acknowledgment();
        for name in [DELETED_CSV, EDITED_CSV, CACHE_CSV] {
            assert!(ack.contains(name));
        }
    }

    #[test]
    fn test_failure_keeps_earlier_files() {
        let (deleted, edited, cache) = logs();
        let temp_dir = tempdir().unwrap();
        let dir = csv_dir(&temp_dir);
        // A directory where the edit export should go makes that step fail
        std::fs::create_dir_all(dir.join(EDITED_CSV)).unwrap();

        let result = Exporter::new(&deleted, &edited, &cache).export_all(&dir);

        match result {
            Err(GhostlogError::Export { file, .. }) => assert!(file.ends_with(EDITED_CSV)),
            other => panic!("Expected Export error, got {:?}", other),
        }
        assert!(dir.join(DELETED_CSV).is_file());
        assert!(!dir.join(CACHE_CSV).exists());
    }
}
