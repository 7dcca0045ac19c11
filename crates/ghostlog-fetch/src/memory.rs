//! In-memory attachment source
//!
//! Serves fixed bytes per URL and counts requests. Used to replay event feeds
//! offline and to drive the cache in tests without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::client::Fetch;

/// Fetcher backed by a URL → bytes map
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    bodies: DashMap<String, Vec<u8>>,
    requests: DashMap<String, usize>,
    total_requests: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    /// Create an empty fetcher; every URL is unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher that sleeps before answering each request
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Serve `body` for `url`
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.bodies.insert(url.into(), body.into());
    }

    /// Number of fetches issued for `url`
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.get(url).map(|count| *count.value()).unwrap_or(0)
    }

    /// Number of fetches issued for any URL
    pub fn total_requests(&self) -> usize {
        self.total_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        *self.requests.entry(url.to_string()).or_insert(0) += 1;
        self.total_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.bodies.get(url).map(|body| body.value().clone())
    }
}
