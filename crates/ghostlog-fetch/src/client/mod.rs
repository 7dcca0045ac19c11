//! HTTP fetcher with a bounded number of concurrent downloads

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::FetchResult;
use ghostlog_core::error::GhostlogError;

/// Default ceiling on concurrent fetches
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Source of raw attachment bytes
///
/// `fetch` never fails loudly: any transport error or non-success response
/// yields `None`.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Retrieve the bytes behind `url`, or `None` if they are unavailable
    async fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum number of fetches in flight; further callers queue
    pub max_concurrent: usize,
    /// Per-request deadline; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: None,
            user_agent: format!("ghostlog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Attachment fetcher over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Concurrency budget shared by every clone of this fetcher
    permits: Arc<Semaphore>,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher with the default configuration
    pub fn new() -> FetchResult<Self> {
        Self::with_config(FetchConfig::default())
    }

    /// Create a fetcher with a custom configuration
    pub fn with_config(config: FetchConfig) -> FetchResult<Self> {
        if config.max_concurrent == 0 || config.max_concurrent > Semaphore::MAX_PERMITS {
            return Err(GhostlogError::ConfigValidation {
                field: "fetch.max_concurrent".to_string(),
                reason: format!("must be between 1 and {}", Semaphore::MAX_PERMITS),
            });
        }

        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_concurrent)
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            GhostlogError::network(format!("Failed to create HTTP client: {}", e), e)
        })?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Number of fetch slots currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Download `url`, reporting why it failed
    pub async fn try_fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        let _permit = self.permits.acquire().await.map_err(|e| {
            GhostlogError::network("Fetch pool is closed".to_string(), e)
        })?;

        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            GhostlogError::network(format!("Failed to fetch {}: {}", url, e), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GhostlogError::Network {
                message: format!("{} returned status {}", url, status),
                source: None,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                GhostlogError::network(format!("Failed to read body of {}: {}", url, e), e)
            })?
            .to_vec();

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        match self.try_fetch(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Attachment unavailable: {}", e);
                None
            },
        }
    }
}
