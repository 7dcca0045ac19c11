//! Attachment resolution
//!
//! Turns an attachment URL into an [`AttachmentRef`]: fetch the bytes, hash
//! them, and store them once per distinct content. Failures never escape as
//! errors; they become `Absent`.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use ghostlog_core::types::AttachmentRef;
use ghostlog_fetch::Fetch;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::cas::{compute_hash, ContentStore};

/// Resolves attachment URLs through a fetcher into the content store
pub struct AttachmentCache {
    fetcher: Arc<dyn Fetch>,
    store: Arc<ContentStore>,
    in_flight: DashMap<String, Arc<OnceCell<AttachmentRef>>>,
}

impl std::fmt::Debug for AttachmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentCache")
            .field("store", &self.store)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl AttachmentCache {
    /// Create a cache over `fetcher` and `store`
    pub fn new(fetcher: Arc<dyn Fetch>, store: Arc<ContentStore>) -> Self {
        Self {
            fetcher,
            store,
            in_flight: DashMap::new(),
        }
    }

    /// The content store behind this cache
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// Resolve one attachment URL
    ///
    /// Concurrent calls for the same URL share a single fetch.
    pub async fn resolve(&self, url: &str) -> AttachmentRef {
        let cell = self.in_flight.entry(url.to_string()).or_default().clone();

        let resolved = cell.get_or_init(|| self.resolve_uncached(url)).await.clone();

        self.in_flight
            .remove_if(url, |_, current| Arc::ptr_eq(current, &cell));

        resolved
    }

    /// Resolve every URL concurrently, keeping input order
    pub async fn resolve_all<S: AsRef<str>>(&self, urls: &[S]) -> Vec<AttachmentRef> {
        join_all(urls.iter().map(|url| self.resolve(url.as_ref()))).await
    }

    async fn resolve_uncached(&self, url: &str) -> AttachmentRef {
        let Some(bytes) = self.fetcher.fetch(url).await else {
            return AttachmentRef::Absent;
        };

        let hash = compute_hash(&bytes);
        match self.store.get_or_insert(&hash, url, &bytes).await {
            Ok(filename) => {
                debug!("Resolved {} to {}", url, filename);
                AttachmentRef::Stored(filename)
            },
            Err(e) => {
                warn!("Failed to store attachment {}: {}", url, e);
                AttachmentRef::Absent
            },
        }
    }
}
