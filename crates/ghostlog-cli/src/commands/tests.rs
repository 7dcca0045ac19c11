//! Unit tests for CLI commands.

use super::*;
use camino::Utf8Path;
use clap::{CommandFactory, Parser};
use ghostlog_audit::{AuditLog, LogKind};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

const DELETE: &str = r#"{"type":"delete","message":{"id":"1","content":"gone","author":{"id":"7","display_name":"ann"},"server":{"id":"9","name":"guild"},"channel_id":"3"}}"#;

/// Create a temporary directory for testing
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn utf8(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("temp dir is UTF-8")
}

/// Create a test command context in a temporary directory
async fn create_test_context(root: &Utf8Path) -> CommandContext {
    let layering = ConfigLayering::new().with_env(HashMap::new());
    CommandContext::load(ConfigLoader::new(root.to_path_buf()), None, &layering)
        .await
        .expect("Failed to load context")
}

#[test]
fn test_cli_definition() {
    Cli::command().debug_assert();
}

#[test]
fn test_ingest_flags_become_overrides() {
    let cli = Cli::parse_from([
        "ghostlog",
        "--db-dir",
        "/data/db",
        "ingest",
        "feed.jsonl",
        "--max-in-flight",
        "3",
        "--timeout-secs",
        "20",
    ]);

    let config = cli_layering(&cli, ConfigLayering::new())
        .apply(GhostlogToml::default())
        .unwrap();

    assert_eq!(config.storage.db_dir, "/data/db");
    assert_eq!(config.ingest.max_in_flight, 3);
    assert_eq!(config.fetch.timeout_secs, Some(20));
    assert_eq!(config.fetch.max_concurrent, 5);
}

#[test]
fn test_invalid_flag_value_is_rejected() {
    let cli = Cli::parse_from(["ghostlog", "ingest", "--max-in-flight", "0"]);

    let result = cli_layering(&cli, ConfigLayering::new()).apply(GhostlogToml::default());
    assert!(matches!(
        result,
        Err(ghostlog_core::error::GhostlogError::ConfigValidation { .. })
    ));
}

#[tokio::test]
async fn test_context_uses_defaults_without_config() {
    let temp_dir = create_temp_dir();
    let root = utf8(&temp_dir);

    let ctx = create_test_context(&root).await;

    assert_eq!(ctx.cwd, root);
    assert_eq!(ctx.config.storage.db_dir, root.join("db"));
    assert_eq!(ctx.config.storage.csv_dir, root.join("csv"));
}

#[tokio::test]
async fn test_context_resolves_against_project_config() {
    let temp_dir = create_temp_dir();
    let root = utf8(&temp_dir);
    fs::write(
        root.join("ghostlog.toml"),
        "[storage]\ndb_dir = \"state\"\n\n[ingest]\nmax_in_flight = 2\n",
    )
    .unwrap();
    let nested = root.join("logs").join("today");
    fs::create_dir_all(&nested).unwrap();

    let ctx = create_test_context(&nested).await;

    assert_eq!(ctx.source, ConfigSource::Project(root.join("ghostlog.toml")));
    assert_eq!(ctx.config.storage.db_dir, root.join("state"));
    assert_eq!(ctx.config.ingest.max_in_flight, 2);
}

#[tokio::test]
async fn test_check_command() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&utf8(&temp_dir)).await;

    assert!(check::execute(&ctx).await.is_ok());
}

#[tokio::test]
async fn test_ingest_then_export() {
    let temp_dir = create_temp_dir();
    let root = utf8(&temp_dir);
    let feed = root.join("feed.jsonl");
    fs::write(&feed, format!("{}\n{}\n", DELETE, DELETE.replace("\"1\"", "\"2\""))).unwrap();

    let ctx = create_test_context(&root).await;
    ingest::execute(Some(feed.into_std_path_buf()), &ctx)
        .await
        .unwrap();

    let log = AuditLog::open(
        ctx.config.storage.db_dir.join(LogKind::Deleted.db_file_name()),
        LogKind::Deleted,
    )
    .unwrap();
    assert_eq!(log.record_count().unwrap(), 2);
    log.close().unwrap();

    export::execute(&ctx).await.unwrap();
    let csv = fs::read_to_string(root.join("csv").join("deleted_db.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);

    assert!(stats::execute(&ctx).await.is_ok());
}

#[tokio::test]
async fn test_ingest_missing_file() {
    let temp_dir = create_temp_dir();
    let root = utf8(&temp_dir);
    let ctx = create_test_context(&root).await;

    let result = ingest::execute(Some(root.join("missing.jsonl").into_std_path_buf()), &ctx).await;
    assert!(matches!(
        result,
        Err(ghostlog_core::error::GhostlogError::Io { .. })
    ));
}
