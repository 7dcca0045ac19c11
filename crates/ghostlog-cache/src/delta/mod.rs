//! Edit delta computation
//!
//! An edit can drop attachments from a message. The delta is every URL of the
//! earlier revision that the later revision no longer carries, compared by URL
//! text.

use std::collections::HashSet;
use std::sync::Arc;

use ghostlog_core::types::AttachmentRef;

use crate::attachment::AttachmentCache;

/// URLs present in `before` and missing from `after`
///
/// Order follows the first appearance in `before`; duplicates are dropped.
pub fn compute_delta<S: AsRef<str>>(before: &[S], after: &[S]) -> Vec<String> {
    let remaining: HashSet<&str> = after.iter().map(|url| url.as_ref()).collect();
    let mut seen = HashSet::new();

    before
        .iter()
        .map(|url| url.as_ref())
        .filter(|url| !remaining.contains(url) && seen.insert(*url))
        .map(str::to_string)
        .collect()
}

/// Resolved attachments of one edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDelta {
    /// Every `before` attachment, in order
    pub old_attachment_refs: Vec<AttachmentRef>,
    /// Only the removed attachments
    pub removed_attachment_refs: Vec<AttachmentRef>,
    /// URLs the removed refs were resolved from
    pub removed_urls: Vec<String>,
}

impl EditDelta {
    /// Check if the edit removed any attachment
    pub fn has_removals(&self) -> bool {
        !self.removed_urls.is_empty()
    }
}

/// Drives attachment caching for edits
#[derive(Debug, Clone)]
pub struct EditDeltaTracker {
    cache: Arc<AttachmentCache>,
}

impl EditDeltaTracker {
    pub fn new(cache: Arc<AttachmentCache>) -> Self {
        Self { cache }
    }

    /// Resolve the full `before` set and the removed subset concurrently
    pub async fn track<S: AsRef<str>>(&self, before: &[S], after: &[S]) -> EditDelta {
        let removed_urls = compute_delta(before, after);

        let (old_attachment_refs, removed_attachment_refs) = tokio::join!(
            self.cache.resolve_all(before),
            self.cache.resolve_all(&removed_urls)
        );

        EditDelta {
            old_attachment_refs,
            removed_attachment_refs,
            removed_urls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::{CacheIndex, ContentStore};
    use camino::Utf8PathBuf;
    use ghostlog_fetch::MemoryFetcher;
    use tempfile::{tempdir, TempDir};

    fn tracker(fetcher: MemoryFetcher) -> (TempDir, Arc<MemoryFetcher>, EditDeltaTracker) {
        let temp_dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().join(".cache")).unwrap();
        let index = Arc::new(CacheIndex::open_in_memory().unwrap());
        let store = Arc::new(ContentStore::new(&root, index).unwrap());
        let fetcher = Arc::new(fetcher);
        let cache = Arc::new(AttachmentCache::new(fetcher.clone(), store));
        (temp_dir, fetcher, EditDeltaTracker::new(cache))
    }

    #[test]
    fn test_compute_delta_basic() {
        let removed = compute_delta(&["a", "b", "c"], &["b"]);
        assert_eq!(removed, vec!["a", "c"]);
    }

    #[test]
    fn test_compute_delta_nothing_removed() {
        assert!(compute_delta(&["a", "b"], &["b", "a", "z"]).is_empty());
        assert!(compute_delta::<&str>(&[], &["a"]).is_empty());
    }

    #[test]
    fn test_compute_delta_drops_duplicates() {
        let removed = compute_delta(&["a", "b", "a", "b"], &["c"]);
        assert_eq!(removed, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_track_resolves_both_sets() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://cdn/a.png", b"a".to_vec());
        fetcher.insert("https://cdn/b.png", b"b".to_vec());
        let (_dir, _fetcher, tracker) = tracker(fetcher);

        let delta = tracker
            .track(&["https://cdn/a.png", "https://cdn/b.png"], &["https://cdn/b.png"])
            .await;

        assert_eq!(delta.removed_urls, vec!["https://cdn/a.png"]);
        assert_eq!(delta.old_attachment_refs.len(), 2);
        assert_eq!(delta.removed_attachment_refs, vec![delta.old_attachment_refs[0].clone()]);
        assert!(delta.has_removals());
    }

    #[tokio::test]
    async fn test_track_unavailable_before_url_is_absent() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://cdn/kept.png", b"kept".to_vec());
        let (_dir, _fetcher, tracker) = tracker(fetcher);

        let delta = tracker
            .track(&["https://cdn/expired.png", "https://cdn/kept.png"], &["https://cdn/kept.png"])
            .await;

        assert_eq!(delta.old_attachment_refs[0], AttachmentRef::Absent);
        assert!(delta.old_attachment_refs[1].is_stored());
        assert_eq!(delta.removed_attachment_refs, vec![AttachmentRef::Absent]);
    }

    #[tokio::test]
    async fn test_track_without_removals() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://cdn/a.png", b"a".to_vec());
        let (_dir, fetcher, tracker) = tracker(fetcher);

        let delta = tracker.track(&["https://cdn/a.png"], &["https://cdn/a.png"]).await;

        assert!(!delta.has_removals());
        assert!(delta.removed_attachment_refs.is_empty());
        assert_eq!(delta.old_attachment_refs.len(), 1);
        assert_eq!(fetcher.total_requests(), 1);
    }
}
