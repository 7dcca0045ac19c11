//! ghostlog.toml configuration parsing and serialization

use std::ops::Range;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ghostlog_core::error::GhostlogError;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "ghostlog.toml";

/// Upper bound for `fetch.max_concurrent`
pub const MAX_FETCH_CONCURRENCY: usize = 1024;

/// Accepted values for `logging.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Complete ghostlog.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GhostlogToml {
    /// Where databases, cached files and exports live
    pub storage: StorageSection,

    /// Attachment fetching
    pub fetch: FetchSection,

    /// Event ingestion
    pub ingest: IngestSection,

    /// Log output
    pub logging: LoggingSection,
}

/// Storage locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Directory holding the three SQLite files
    pub db_dir: Utf8PathBuf,

    /// Directory holding cached attachment files
    pub cache_dir: Utf8PathBuf,

    /// Directory receiving CSV exports
    pub csv_dir: Utf8PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_dir: Utf8PathBuf::from("db"),
            cache_dir: Utf8PathBuf::from(".cache"),
            csv_dir: Utf8PathBuf::from("csv"),
        }
    }
}

impl StorageSection {
    /// Resolve relative directories against `base`
    pub fn resolved(&self, base: &Utf8Path) -> StorageSection {
        let resolve = |dir: &Utf8PathBuf| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                base.join(dir)
            }
        };

        StorageSection {
            db_dir: resolve(&self.db_dir),
            cache_dir: resolve(&self.cache_dir),
            csv_dir: resolve(&self.csv_dir),
        }
    }
}

/// Fetch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    /// Concurrent downloads allowed
    pub max_concurrent: usize,

    /// Per-request timeout in seconds; unset means no timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            timeout_secs: None,
            user_agent: format!("ghostlog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchSection {
    /// Configured timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestSection {
    /// Events processed concurrently
    pub max_in_flight: usize,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self { max_in_flight: 1 }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Default log level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse TOML string to GhostlogToml configuration
pub fn parse_ghostlog_toml(content: &str) -> ConfigResult<GhostlogToml> {
    // First pass with toml_edit for syntax errors with a location
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| parse_error(content, e.message(), e.span()))?;

    // Then parse with serde for type safety
    let config: GhostlogToml =
        ::toml::from_str(content).map_err(|e| parse_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize GhostlogToml to TOML string
pub fn serialize_ghostlog_toml(config: &GhostlogToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| GhostlogError::ConfigParse {
        message: format!("serialization failed: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration values
pub fn validate_config(config: &GhostlogToml) -> ConfigResult<()> {
    for (field, dir) in [
        ("storage.db_dir", &config.storage.db_dir),
        ("storage.cache_dir", &config.storage.cache_dir),
        ("storage.csv_dir", &config.storage.csv_dir),
    ] {
        if dir.as_str().trim().is_empty() {
            return Err(invalid(field, "directory must not be empty"));
        }
    }

    if config.fetch.max_concurrent == 0 || config.fetch.max_concurrent > MAX_FETCH_CONCURRENCY {
        return Err(invalid(
            "fetch.max_concurrent",
            &format!("must be between 1 and {}", MAX_FETCH_CONCURRENCY),
        ));
    }

    if config.fetch.timeout_secs == Some(0) {
        return Err(invalid(
            "fetch.timeout_secs",
            "must be at least 1; remove the key to disable the timeout",
        ));
    }

    if config.fetch.user_agent.trim().is_empty() {
        return Err(invalid("fetch.user_agent", "must not be empty"));
    }

    if config.ingest.max_in_flight == 0 {
        return Err(invalid("ingest.max_in_flight", "must be at least 1"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            &format!(
                "'{}' is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    Ok(())
}

/// Load and parse ghostlog.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<GhostlogToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GhostlogError::io(format!("Failed to read {}", path), e))?;

    parse_ghostlog_toml(&content).map_err(|e| match e {
        GhostlogError::ConfigParse {
            message,
            line,
            column,
        } => GhostlogError::ConfigParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

fn invalid(field: &str, reason: &str) -> GhostlogError {
    GhostlogError::ConfigValidation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_error(content: &str, message: &str, span: Option<Range<usize>>) -> GhostlogError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));

    GhostlogError::ConfigParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|last| last.chars().count() + 1)
        .unwrap_or(1);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_ghostlog_toml("").unwrap();
        assert_eq!(config, GhostlogToml::default());
        assert_eq!(config.storage.db_dir, "db");
        assert_eq!(config.storage.cache_dir, ".cache");
        assert_eq!(config.storage.csv_dir, "csv");
        assert_eq!(config.fetch.max_concurrent, 5);
        assert!(config.fetch.timeout().is_none());
        assert_eq!(config.ingest.max_in_flight, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[storage]
db_dir = "/var/lib/ghostlog/db"
cache_dir = "attachments"
csv_dir = "exports"

[fetch]
max_concurrent = 8
timeout_secs = 30
user_agent = "audit-bot/1.0"

[ingest]
max_in_flight = 4

[logging]
level = "debug"
"#;

        let config = parse_ghostlog_toml(toml).unwrap();
        assert_eq!(config.storage.db_dir, "/var/lib/ghostlog/db");
        assert_eq!(config.fetch.max_concurrent, 8);
        assert_eq!(config.fetch.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.fetch.user_agent, "audit-bot/1.0");
        assert_eq!(config.ingest.max_in_flight, 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let toml = "[storage]\ndb_dir = \"db\"\ncache_dir = \n";

        match parse_ghostlog_toml(toml) {
            Err(GhostlogError::ConfigParse { line, column, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 1);
            },
            other => panic!("Expected ConfigParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let toml = "[fetch]\nmax_concurent = 3\n";
        assert!(matches!(
            parse_ghostlog_toml(toml),
            Err(GhostlogError::ConfigParse { line: 2, .. })
        ));
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        match parse_ghostlog_toml("[fetch]\nmax_concurrent = 0\n") {
            Err(GhostlogError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "fetch.max_concurrent")
            },
            other => panic!("Expected ConfigValidation error, got {:?}", other),
        }
    }

    #[test]
    fn test_excessive_concurrency_is_invalid() {
        let toml = format!("[fetch]\nmax_concurrent = {}\n", MAX_FETCH_CONCURRENCY + 1);
        match parse_ghostlog_toml(&toml) {
            Err(GhostlogError::ConfigValidation { field, reason }) => {
                assert_eq!(field, "fetch.max_concurrent");
                assert!(reason.contains("1024"));
            },
            other => panic!("Expected ConfigValidation error, got {:?}", other),
        }

        let at_limit = format!("[fetch]\nmax_concurrent = {}\n", MAX_FETCH_CONCURRENCY);
        assert!(parse_ghostlog_toml(&at_limit).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        match parse_ghostlog_toml("[logging]\nlevel = \"loud\"\n") {
            Err(GhostlogError::ConfigValidation { field, reason }) => {
                assert_eq!(field, "logging.level");
                assert!(reason.contains("loud"));
            },
            other => panic!("Expected ConfigValidation error, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_serialization() {
        let mut config = GhostlogToml::default();
        config.fetch.timeout_secs = Some(10);
        config.storage.csv_dir = Utf8PathBuf::from("out");

        let serialized = serialize_ghostlog_toml(&config).unwrap();
        assert_eq!(parse_ghostlog_toml(&serialized).unwrap(), config);
    }

    #[test]
    fn test_resolved_storage_paths() {
        let storage = StorageSection {
            db_dir: Utf8PathBuf::from("/abs/db"),
            ..StorageSection::default()
        };

        let resolved = storage.resolved(Utf8Path::new("/srv/bot"));
        assert_eq!(resolved.db_dir, "/abs/db");
        assert_eq!(resolved.cache_dir, "/srv/bot/.cache");
        assert_eq!(resolved.csv_dir, "/srv/bot/csv");
    }

    #[test]
    fn test_line_column() {
        let text = "a\nbc\ndef";
        assert_eq!(line_column(text, 0), (1, 1));
        assert_eq!(line_column(text, 3), (2, 2));
        assert_eq!(line_column(text, 5), (3, 1));
    }
}
