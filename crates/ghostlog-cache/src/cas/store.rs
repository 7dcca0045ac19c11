//! CAS store implementation
//!
//! This module provides the ContentStore, the deduplication authority of the
//! attachment cache. Novel content is written once per hash; concurrent
//! inserts of the same novel hash are serialized by a per-hash lock.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use ghostlog_core::error::GhostlogError;
use ghostlog_core::utils::safe_join;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::naming::generate_filename;
use super::{CacheEntry, CacheIndex, ContentHash};
use crate::CacheResult;

/// Content-addressable storage
#[derive(Debug)]
pub struct ContentStore {
    /// Directory holding the cached files
    root_path: Utf8PathBuf,
    /// Hash → filename mapping
    index: Arc<CacheIndex>,
    /// Insert locks for hashes currently being written
    locks: DashMap<ContentHash, Arc<Mutex<()>>>,
}

impl ContentStore {
    /// Create a new content store rooted at `root_path`
    pub fn new<P: AsRef<Utf8Path>>(root_path: P, index: Arc<CacheIndex>) -> CacheResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&root_path)
            .map_err(|e| GhostlogError::io(format!("Failed to create cache directory {}", root_path), e))?;

        Ok(Self {
            root_path,
            index,
            locks: DashMap::new(),
        })
    }

    /// Get the root path of the store
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// The index backing this store
    pub fn index(&self) -> &Arc<CacheIndex> {
        &self.index
    }

    /// Full path of a stored file
    pub fn file_path(&self, filename: &str) -> CacheResult<std::path::PathBuf> {
        safe_join(self.root_path.as_std_path(), Path::new(filename))
    }

    /// Check if content with this hash is stored
    pub fn contains(&self, hash: &ContentHash) -> CacheResult<bool> {
        Ok(self.index.lookup(hash)?.is_some())
    }

    /// Stored filename for `hash`, if any
    pub fn lookup(&self, hash: &ContentHash) -> CacheResult<Option<String>> {
        self.index.lookup(hash)
    }

    /// All index entries in insertion order
    pub fn entries(&self) -> CacheResult<Vec<CacheEntry>> {
        self.index.entries()
    }
}

impl ContentStore {
    /// Return the filename for `hash`, storing `content` first if it is new
    ///
    /// Existing content causes no disk write. For a novel hash the lookup,
    /// file write and index insert run under that hash's lock, so concurrent
    /// callers with identical bytes produce one file and one index row.
    pub async fn get_or_insert(
        &self,
        hash: &ContentHash,
        source_url: &str,
        content: &[u8],
    ) -> CacheResult<String> {
        if let Some(existing) = self.index.lookup(hash)? {
            debug!("Cache hit for {} ({})", hash, existing);
            return Ok(existing);
        }

        let lock = self.locks.entry(*hash).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.insert_locked(hash, source_url, content).await
        };

        drop(lock);
        self.locks.remove_if(hash, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn insert_locked(
        &self,
        hash: &ContentHash,
        source_url: &str,
        content: &[u8],
    ) -> CacheResult<String> {
        // A previous holder of the lock may have stored it already
        if let Some(existing) = self.index.lookup(hash)? {
            debug!("Cache hit for {} after waiting ({})", hash, existing);
            return Ok(existing);
        }

        let filename = generate_filename(source_url);
        let path = self.file_path(&filename)?;
        write_new_file(&path, content)
            .await
            .map_err(|e| {
                GhostlogError::store_write(hash.to_hex(), format!("Failed to write {}", path.display()), e)
            })?;

        let entry = CacheEntry::new(source_url, *hash, filename.clone());
        let stored = match self.index.insert(&entry) {
            Ok(stored) => stored,
            Err(e) => {
                remove_orphan(&path).await;
                return Err(e);
            },
        };

        if stored != filename {
            // Another process recorded this hash between our lookup and insert
            remove_orphan(&path).await;
        } else {
            debug!("Stored {} bytes for {} as {}", content.len(), hash, filename);
        }

        Ok(stored)
    }
}

async fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.sync_all().await
}

async fn remove_orphan(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove orphaned cache file {}: {}", path.display(), e);
        }
    }
}
