//! Startup-built context holding every store handle
//!
//! Open once, share behind an `Arc`, close on shutdown.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ghostlog_cache::{AttachmentCache, CacheIndex, ContentStore, EditDeltaTracker};
use ghostlog_config::{GhostlogToml, StorageSection};
use ghostlog_core::error::GhostlogError;
use ghostlog_fetch::{Fetch, FetchConfig, HttpFetcher};
use tracing::{debug, info};

use crate::export::{ExportSummary, Exporter};
use crate::log::{AuditLog, LogKind};
use crate::AuditResult;

/// File name of the cache index database
pub const CACHE_DB_FILE: &str = "cache_db.sqlite";

/// Every handle the event handler needs
#[derive(Debug)]
pub struct AuditContext {
    storage: StorageSection,
    deleted: AuditLog,
    edited: AuditLog,
    index: Arc<CacheIndex>,
    cache: Arc<AttachmentCache>,
    tracker: EditDeltaTracker,
}

/// Row counts across the three databases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStats {
    pub deletions: usize,
    pub edits: usize,
    pub cached_files: usize,
}

impl AuditContext {
    /// Open every store and build an HTTP fetcher from `config`
    pub fn open(config: &GhostlogToml) -> AuditResult<Self> {
        let fetcher = HttpFetcher::with_config(fetch_config(config))?;
        Self::open_with_fetcher(&config.storage, Arc::new(fetcher))
    }

    /// Open every store with a caller-supplied fetcher
    pub fn open_with_fetcher(storage: &StorageSection, fetcher: Arc<dyn Fetch>) -> AuditResult<Self> {
        for dir in [&storage.db_dir, &storage.cache_dir, &storage.csv_dir] {
            create_dir(dir)?;
        }

        let deleted = AuditLog::open(
            storage.db_dir.join(LogKind::Deleted.db_file_name()),
            LogKind::Deleted,
        )?;
        let edited = AuditLog::open(
            storage.db_dir.join(LogKind::Edited.db_file_name()),
            LogKind::Edited,
        )?;
        let index = Arc::new(CacheIndex::open(storage.db_dir.join(CACHE_DB_FILE))?);

        let store = Arc::new(ContentStore::new(&storage.cache_dir, index.clone())?);
        let cache = Arc::new(AttachmentCache::new(fetcher, store));
        let tracker = EditDeltaTracker::new(cache.clone());

        info!(
            "Opened audit stores in {} (cache: {})",
            storage.db_dir, storage.cache_dir
        );

        Ok(Self {
            storage: storage.clone(),
            deleted,
            edited,
            index,
            cache,
            tracker,
        })
    }

    pub fn storage(&self) -> &StorageSection {
        &self.storage
    }

    pub fn deleted_log(&self) -> &AuditLog {
        &self.deleted
    }

    pub fn edited_log(&self) -> &AuditLog {
        &self.edited
    }

    pub fn cache_index(&self) -> &CacheIndex {
        &self.index
    }

    pub fn attachments(&self) -> &AttachmentCache {
        &self.cache
    }

    pub fn delta_tracker(&self) -> &EditDeltaTracker {
        &self.tracker
    }

    /// Export all stores into the configured csv directory
    pub fn export(&self) -> AuditResult<ExportSummary> {
        self.export_to(&self.storage.csv_dir)
    }

    /// Export all stores into `csv_dir`
    pub fn export_to(&self, csv_dir: &Utf8Path) -> AuditResult<ExportSummary> {
        Exporter::new(&self.deleted, &self.edited, &self.index).export_all(csv_dir)
    }

    /// Current row counts
    pub fn stats(&self) -> AuditResult<AuditStats> {
        Ok(AuditStats {
            deletions: self.deleted.record_count()?,
            edits: self.edited.record_count()?,
            cached_files: self.index.len()?,
        })
    }

    /// Close every connection
    pub fn close(self) -> AuditResult<()> {
        let Self {
            deleted,
            edited,
            index,
            cache,
            tracker,
            ..
        } = self;

        deleted.close()?;
        edited.close()?;

        // The store holds the other reference to the index
        drop(tracker);
        drop(cache);
        match Arc::try_unwrap(index) {
            Ok(index) => index.close()?,
            Err(_) => debug!("Cache index still shared; it closes when the last handle drops"),
        }

        info!("Closed audit stores");
        Ok(())
    }
}

/// Fetcher settings from the `[fetch]` section
pub fn fetch_config(config: &GhostlogToml) -> FetchConfig {
    FetchConfig {
        max_concurrent: config.fetch.max_concurrent,
        timeout: config.fetch.timeout(),
        user_agent: config.fetch.user_agent.clone(),
    }
}

fn create_dir(dir: &Utf8PathBuf) -> AuditResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| GhostlogError::io(format!("Failed to create directory {}", dir), e))
}
