//! Configuration parsing for ghostlog
//!
//! This crate handles parsing and validation of ghostlog.toml and layers
//! environment and command-line overrides on top of it.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, ENV_PREFIX};
pub use toml::{
    FetchSection, GhostlogToml, IngestSection, LoggingSection, StorageSection, CONFIG_FILE_NAME,
};

use ghostlog_core::error::GhostlogError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, GhostlogError>;
