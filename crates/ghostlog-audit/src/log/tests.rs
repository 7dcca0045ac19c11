//! Unit tests for the audit logs

use super::*;
use ghostlog_core::types::{AttachmentRef, MessageSnapshot};
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

fn deletion_log() -> AuditLog {
    let log = AuditLog::open_in_memory(LogKind::Deleted).unwrap();
    log.upsert_user(&User::new("7", "ann")).unwrap();
    log.upsert_server(&Server::new("9", "guild")).unwrap();
    log
}

fn edit_log() -> AuditLog {
    let log = AuditLog::open_in_memory(LogKind::Edited).unwrap();
    log.upsert_user(&User::new("7", "ann")).unwrap();
    log.upsert_server(&Server::new("9", "guild")).unwrap();
    log
}

#[test]
fn test_append_deletion_assigns_increasing_ids() {
    let log = deletion_log();

    let first = log
        .append_deletion(&DeletionRecord::new(&snapshot("1", "hello"), Vec::new()))
        .unwrap();
    let second = log
        .append_deletion(&DeletionRecord::new(&snapshot("2", "world"), Vec::new()))
        .unwrap();

    assert!(second > first);
    assert_eq!(log.record_count().unwrap(), 2);
}

#[test]
fn test_deletion_round_trip_keeps_ref_positions() {
    let log = deletion_log();
    let refs = vec![
        AttachmentRef::Stored("aaaaaaaaaaaa.png.cache".to_string()),
        AttachmentRef::Absent,
    ];
    let record = DeletionRecord::new(&snapshot("1", "with files"), refs.clone());

    let entry_id = log.append_deletion(&record).unwrap();
    let stored = log.deletions().unwrap();

    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].entry_id, Some(entry_id));
    assert_eq!(stored[0].content, "with files");
    assert_eq!(stored[0].attachment_refs, refs);
    assert_eq!(stored[0].timestamp, record.timestamp);
}

#[test]
fn test_deletion_without_attachments() {
    let log = deletion_log();
    log.append_deletion(&DeletionRecord::new(&snapshot("1", "plain"), Vec::new()))
        .unwrap();

    assert!(log.deletions().unwrap()[0].attachment_refs.is_empty());
}

#[test]
fn test_edit_round_trip() {
    let log = edit_log();
    let removed = vec![AttachmentRef::Stored("bbbbbbbbbbbb.jpg.cache".to_string())];
    let old = vec![
        AttachmentRef::Stored("aaaaaaaaaaaa.png.cache".to_string()),
        removed[0].clone(),
    ];
    let record = EditRecord::new(&snapshot("5", "before"), &snapshot("5", "after"), old.clone(), removed.clone());

    log.append_edit(&record).unwrap();
    let edits = log.edits().unwrap();

    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].old_content, "before");
    assert_eq!(edits[0].new_content, "after");
    assert_eq!(edits[0].old_attachment_refs, old);
    assert_eq!(edits[0].removed_attachment_refs, removed);
}

#[test]
fn test_upsert_last_write_wins() {
    let log = AuditLog::open_in_memory(LogKind::Deleted).unwrap();

    log.upsert_user(&User::new("7", "ann")).unwrap();
    let renamed = User {
        avatar_url: "https://cdn/new.png".to_string(),
        ..User::new("7", "annie")
    };
    log.upsert_user(&renamed).unwrap();
    log.upsert_server(&Server::new("9", "guild")).unwrap();
    log.upsert_server(&Server::new("9", "renamed guild")).unwrap();

    assert_eq!(log.user("7").unwrap(), Some(renamed));
    assert_eq!(log.server("9").unwrap().unwrap().name, "renamed guild");
    assert_eq!(log.user("8").unwrap(), None);
}

#[test]
fn test_append_requires_known_author() {
    let log = AuditLog::open_in_memory(LogKind::Deleted).unwrap();
    let result = log.append_deletion(&DeletionRecord::new(&snapshot("1", "orphan"), Vec::new()));

    assert!(matches!(result, Err(GhostlogError::Persistence { .. })));
    assert_eq!(log.record_count().unwrap(), 0);
}

#[test]
fn test_wrong_log_kind_is_rejected() {
    let log = edit_log();
    let result = log.append_deletion(&DeletionRecord::new(&snapshot("1", "x"), Vec::new()));
    assert!(matches!(result, Err(GhostlogError::Persistence { source: None, .. })));
    assert!(log.deletions().is_err());
}

#[test]
fn test_logs_persist_across_reopen() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join(LogKind::Deleted.db_file_name());

    {
        let log = AuditLog::open(&path, LogKind::Deleted).unwrap();
        log.upsert_user(&User::new("7", "ann")).unwrap();
        log.upsert_server(&Server::new("9", "guild")).unwrap();
        log.append_deletion(&DeletionRecord::new(&snapshot("1", "kept"), Vec::new()))
            .unwrap();
        log.close().unwrap();
    }

    let log = AuditLog::open(&path, LogKind::Deleted).unwrap();
    assert_eq!(log.deletions().unwrap()[0].content, "kept");
}
