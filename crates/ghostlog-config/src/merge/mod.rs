//! Configuration layering, fallback logic, and environment overrides
//!
//! Layers, lowest priority first: built-in defaults, the configuration file,
//! `GHOSTLOG_*` environment variables, command-line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use ghostlog_core::error::GhostlogError;
use tracing::debug;

use crate::toml::{validate_config, GhostlogToml, CONFIG_FILE_NAME};
use crate::ConfigResult;

/// Prefix of environment variables that override configuration
pub const ENV_PREFIX: &str = "GHOSTLOG_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Explicitly given file
    Explicit(Utf8PathBuf),
    /// ghostlog.toml found in the working directory or a parent
    Project(Utf8PathBuf),
    /// Per-user file under the platform config directory
    Global(Utf8PathBuf),
    /// No file; built-in defaults
    Defaults,
}

impl ConfigSource {
    /// Path of the file the configuration came from
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Project(path) | ConfigSource::Global(path) => {
                Some(path.as_path())
            },
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path),
            None => write!(f, "built-in defaults"),
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Create a loader rooted at the process working directory
    pub fn from_current_dir() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| GhostlogError::io("Failed to read current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| GhostlogError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Working directory is not valid UTF-8: {}", e),
        })?;
        Ok(Self::new(cwd))
    }

    /// Working directory this loader searches from
    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Load the file layer
    ///
    /// An explicit path must exist. Otherwise the nearest ghostlog.toml up the
    /// directory tree is used, then the per-user file, then defaults.
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(GhostlogToml, ConfigSource)> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.cwd.join(path)
            };
            let config = crate::toml::load_from_file(&path).await?;
            return Ok((config, ConfigSource::Explicit(path)));
        }

        if let Some(path) = self.find_project_config() {
            let config = crate::toml::load_from_file(&path).await?;
            return Ok((config, ConfigSource::Project(path)));
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                let config = crate::toml::load_from_file(&path).await?;
                return Ok((config, ConfigSource::Global(path)));
            }
        }

        debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        Ok((GhostlogToml::default(), ConfigSource::Defaults))
    }

    /// Find ghostlog.toml in the working directory or its parents
    pub fn find_project_config(&self) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Per-user configuration file location
    pub fn global_config_path() -> Option<Utf8PathBuf> {
        let config_dir = dirs::config_dir()?;
        Utf8PathBuf::try_from(config_dir)
            .ok()
            .map(|dir| dir.join("ghostlog").join(CONFIG_FILE_NAME))
    }

    /// Directory relative storage paths are resolved against
    pub fn base_dir(&self, source: &ConfigSource) -> Utf8PathBuf {
        match source {
            ConfigSource::Explicit(path) | ConfigSource::Project(path) => path
                .parent()
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(|| self.cwd.clone()),
            ConfigSource::Global(_) | ConfigSource::Defaults => self.cwd.clone(),
        }
    }
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering {
    /// Environment overrides
    env_overrides: HashMap<String, String>,
    /// CLI flag overrides
    cli_overrides: HashMap<String, String>,
}

impl ConfigLayering {
    /// Create an empty layering
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the `GHOSTLOG_*` variables of the current process
    pub fn with_process_env(mut self) -> Self {
        self.env_overrides = Self::collect_env_overrides(std::env::vars());
        self
    }

    /// Add environment overrides
    pub fn with_env(mut self, overrides: HashMap<String, String>) -> Self {
        self.env_overrides.extend(overrides);
        self
    }

    /// Add a CLI flag override by config key (e.g. `fetch.max_concurrent`)
    pub fn with_cli(mut self, key: &str, value: impl ToString) -> Self {
        self.cli_overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// Apply environment then CLI overrides to `config` and validate
    pub fn apply(&self, config: GhostlogToml) -> ConfigResult<GhostlogToml> {
        Self::merge_configs(config, &self.env_overrides, &self.cli_overrides)
    }

    /// Merge the override layers over a file configuration
    pub fn merge_configs(
        file_config: GhostlogToml,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<GhostlogToml> {
        let mut merged = file_config;

        for (name, value) in env_overrides {
            let Some(key) = env_key(name) else {
                debug!("Ignoring unknown environment override {}", name);
                continue;
            };
            apply_override(&mut merged, key, value, name)?;
        }

        // CLI flags have the highest priority
        for (key, value) in cli_overrides {
            apply_override(&mut merged, key, value, key)?;
        }

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Collect `GHOSTLOG_*` variables from `vars`
    pub fn collect_env_overrides<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

/// Config key addressed by an environment variable
fn env_key(name: &str) -> Option<&'static str> {
    let key = match name.strip_prefix(ENV_PREFIX)? {
        "DB_DIR" => "storage.db_dir",
        "CACHE_DIR" => "storage.cache_dir",
        "CSV_DIR" => "storage.csv_dir",
        "MAX_CONCURRENT" | "FETCH_MAX_CONCURRENT" => "fetch.max_concurrent",
        "TIMEOUT_SECS" | "FETCH_TIMEOUT_SECS" => "fetch.timeout_secs",
        "USER_AGENT" => "fetch.user_agent",
        "MAX_IN_FLIGHT" | "INGEST_MAX_IN_FLIGHT" => "ingest.max_in_flight",
        "LOG_LEVEL" => "logging.level",
        _ => return None,
    };
    Some(key)
}

fn apply_override(config: &mut GhostlogToml, key: &str, value: &str, origin: &str) -> ConfigResult<()> {
    let number = |field: &str| -> ConfigResult<u64> {
        value.trim().parse().map_err(|e| GhostlogError::ConfigValidation {
            field: field.to_string(),
            reason: format!("Invalid number '{}' from {}: {}", value, origin, e),
        })
    };

    match key {
        "storage.db_dir" => config.storage.db_dir = Utf8PathBuf::from(value),
        "storage.cache_dir" => config.storage.cache_dir = Utf8PathBuf::from(value),
        "storage.csv_dir" => config.storage.csv_dir = Utf8PathBuf::from(value),
        "fetch.max_concurrent" => config.fetch.max_concurrent = number(key)? as usize,
        "fetch.timeout_secs" => {
            config.fetch.timeout_secs = if value.trim().is_empty() || value.trim() == "none" {
                None
            } else {
                Some(number(key)?)
            };
        },
        "fetch.user_agent" => config.fetch.user_agent = value.to_string(),
        "ingest.max_in_flight" => config.ingest.max_in_flight = number(key)? as usize,
        "logging.level" => config.logging.level = value.trim().to_lowercase(),
        _ => {
            return Err(GhostlogError::ConfigValidation {
                field: key.to_string(),
                reason: format!("Unknown configuration key from {}", origin),
            })
        },
    }

    Ok(())
}
