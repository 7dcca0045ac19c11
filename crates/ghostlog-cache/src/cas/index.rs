//! CAS index for the hash → filename mapping
//!
//! The index lives in its own SQLite database (`cache` table). The content
//! hash is the primary key, so a second insert for the same content is ignored
//! and the first stored filename stays authoritative.

use std::path::Path;

use ghostlog_core::error::GhostlogError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ContentHash;
use crate::CacheResult;

/// One row of the cache index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// URL the content was last fetched from; informational only
    pub source_url: String,
    /// Content hash (primary key)
    pub hash: ContentHash,
    /// Filename of the stored content inside the cache directory
    pub stored_filename: String,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(source_url: impl Into<String>, hash: ContentHash, stored_filename: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            hash,
            stored_filename: stored_filename.into(),
        }
    }
}

fn db_error(message: &str) -> impl FnOnce(rusqlite::Error) -> GhostlogError + '_ {
    move |e| GhostlogError::persistence(format!("{}: {}", message, e), e)
}

/// Index for managing cache entries
#[derive(Debug)]
pub struct CacheIndex {
    conn: Mutex<Connection>,
}

impl CacheIndex {
    /// Open or create the index database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_error("Failed to open cache index"))?;
        let index = Self {
            conn: Mutex::new(conn),
        };
        index.init()?;
        debug!("Opened cache index at {}", path.as_ref().display());
        Ok(index)
    }

    /// Open an in-memory index (for testing)
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_error("Failed to open cache index"))?;
        let index = Self {
            conn: Mutex::new(conn),
        };
        index.init()?;
        Ok(index)
    }

    fn init(&self) -> CacheResult<()> {
        self.conn
            .lock()
            .execute_batch(
                "
                PRAGMA journal_mode=WAL;
                CREATE TABLE IF NOT EXISTS cache (
                    url             TEXT,
                    attachment_hash TEXT PRIMARY KEY,
                    file            TEXT
                );
                ",
            )
            .map_err(db_error("Failed to create cache table"))
    }

    /// Stored filename for `hash`, if the content is cached
    pub fn lookup(&self, hash: &ContentHash) -> CacheResult<Option<String>> {
        self.conn
            .lock()
            .query_row(
                "SELECT file FROM cache WHERE attachment_hash = ?1",
                params![hash.to_hex()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error("Failed to look up cache entry"))
    }

    /// Insert `entry` unless its hash is already present
    ///
    /// Returns the filename that is authoritative after the insert: the
    /// entry's own on success, the existing one when another writer won.
    pub fn insert(&self, entry: &CacheEntry) -> CacheResult<String> {
        let conn = self.conn.lock();
        let key = entry.hash.to_hex();

        conn.execute(
            "INSERT OR IGNORE INTO cache (url, attachment_hash, file) VALUES (?1, ?2, ?3)",
            params![entry.source_url, key, entry.stored_filename],
        )
        .map_err(db_error("Failed to insert cache entry"))?;

        conn.query_row(
            "SELECT file FROM cache WHERE attachment_hash = ?1",
            params![key],
            |row| row.get(0),
        )
        .map_err(db_error("Failed to read back cache entry"))
    }

    /// All entries in insertion order
    pub fn entries(&self) -> CacheResult<Vec<CacheEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT url, attachment_hash, file FROM cache ORDER BY rowid")
            .map_err(db_error("Failed to query cache entries"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(db_error("Failed to query cache entries"))?;

        let mut entries = Vec::new();
        for row in rows {
            let (url, hash, file) = row.map_err(db_error("Failed to read cache entry"))?;
            entries.push(CacheEntry::new(
                url.unwrap_or_default(),
                ContentHash::from_hex(&hash)?,
                file.unwrap_or_default(),
            ));
        }

        Ok(entries)
    }

    /// Get entry count
    pub fn len(&self) -> CacheResult<usize> {
        self.conn
            .lock()
            .query_row("SELECT COUNT(*) FROM cache", [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .map_err(db_error("Failed to count cache entries"))
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Close the underlying connection
    pub fn close(self) -> CacheResult<()> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| GhostlogError::persistence(format!("Failed to close cache index: {}", e), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::compute_hash;
    use tempfile::tempdir;

    #[test]
    fn test_insert_and_lookup() {
        let index = CacheIndex::open_in_memory().unwrap();
        let hash = compute_hash(b"bytes");

        assert_eq!(index.lookup(&hash).unwrap(), None);

        let entry = CacheEntry::new("https://cdn/a.png", hash, "aaaaaaaaaaaa.png.cache");
        assert_eq!(index.insert(&entry).unwrap(), "aaaaaaaaaaaa.png.cache");
        assert_eq!(
            index.lookup(&hash).unwrap(),
            Some("aaaaaaaaaaaa.png.cache".to_string())
        );
    }

    #[test]
    fn test_second_insert_keeps_first_filename() {
        let index = CacheIndex::open_in_memory().unwrap();
        let hash = compute_hash(b"same bytes");

        index
            .insert(&CacheEntry::new("https://cdn/a.png", hash, "first.png.cache"))
            .unwrap();
        let winner = index
            .insert(&CacheEntry::new("https://cdn/b.png", hash, "second.png.cache"))
            .unwrap();

        assert_eq!(winner, "first.png.cache");
        assert_eq!(index.len().unwrap(), 1);
        assert_eq!(index.entries().unwrap()[0].source_url, "https://cdn/a.png");
    }

    #[test]
    fn test_index_persistence() {
        let temp_dir = tempdir().unwrap();
        let index_path = temp_dir.path().join("cache_db.sqlite");
        let hash = compute_hash(b"persisted");

        {
            let index = CacheIndex::open(&index_path).unwrap();
            index
                .insert(&CacheEntry::new("https://cdn/p.gif", hash, "pppppppppppp.gif.cache"))
                .unwrap();
            index.close().unwrap();
        }

        let index = CacheIndex::open(&index_path).unwrap();
        let entries = index.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, hash);
        assert_eq!(entries[0].stored_filename, "pppppppppppp.gif.cache");
        assert!(!index.is_empty().unwrap());
    }
}
