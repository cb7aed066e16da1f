//! Common Crawl archive provider.
//!
//! Queries the CDX index at `index.commoncrawl.org` and reads captures from
//! `data.commoncrawl.org`. The snapshot catalog is fetched once when the
//! provider is built and cached for its lifetime.

mod pages;

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cdx::catalog::resolve_catalog;
use crate::cdx::{CaptureRecord, IndexSnapshot, RequestConfig, decode_page};
use crate::error::{Error, Result};
use crate::io::{HttpTransport, ResilientClient, Transport};
use crate::provider::{Cancellation, PartialResults, Provider};
use crate::warc::WarcExtractor;

pub const INDEX_SERVER: &str = "https://index.commoncrawl.org";
pub const CRAWL_STORAGE: &str = "https://data.commoncrawl.org";

/// Endpoints and request policy of a [`CommonCrawl`] provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonCrawlConfig {
    /// Index server root, without trailing slash
    pub index_server: String,
    /// Bulk storage root, without trailing slash
    pub storage_root: String,
    /// Timeout of every single request attempt
    pub timeout: Duration,
    /// Attempts per index request
    pub max_retries: u32,
    /// Backoff step between index request attempts
    pub backoff_unit: Duration,
}

impl Default for CommonCrawlConfig {
    fn default() -> Self {
        Self {
            index_server: INDEX_SERVER.to_string(),
            storage_root: CRAWL_STORAGE.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl CommonCrawlConfig {
    pub fn with_index_server(mut self, url: impl Into<String>) -> Self {
        self.index_server = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_storage_root(mut self, url: impl Into<String>) -> Self {
        self.storage_root = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }
}

/// Common Crawl provider.
///
/// Always handed out as `Arc<Self>`: records decoded by the provider keep a
/// weak reference back to it for payload retrieval.
pub struct CommonCrawl<T: Transport = HttpTransport> {
    config: CommonCrawlConfig,
    client: Arc<ResilientClient<T>>,
    extractor: WarcExtractor<T>,
    snapshots: Vec<IndexSnapshot>,
    this: Weak<Self>,
}

impl CommonCrawl<HttpTransport> {
    /// Build a provider over HTTP, resolving the snapshot catalog.
    ///
    /// # Errors
    ///
    /// Fails when the catalog cannot be fetched or decoded, or is empty.
    pub async fn new(config: CommonCrawlConfig) -> Result<Arc<Self>> {
        Self::with_transport(config, HttpTransport::new()?).await
    }
}

impl<T: Transport + 'static> CommonCrawl<T> {
    /// Build a provider on a custom transport, resolving the snapshot catalog.
    pub async fn with_transport(config: CommonCrawlConfig, transport: T) -> Result<Arc<Self>> {
        let client =
            Arc::new(ResilientClient::new(transport).with_backoff_unit(config.backoff_unit));

        let snapshots = resolve_catalog(
            &client,
            &config.index_server,
            config.timeout,
            config.max_retries,
        )
        .await?;

        let extractor = WarcExtractor::new(client.clone(), config.storage_root.clone(), config.timeout);

        Ok(Arc::new_cyclic(|this| Self {
            config,
            client,
            extractor,
            snapshots,
            this: this.clone(),
        }))
    }

    pub fn config(&self) -> &CommonCrawlConfig {
        &self.config
    }

    /// Cached catalog, newest snapshot first.
    pub fn snapshots(&self) -> &[IndexSnapshot] {
        &self.snapshots
    }

    /// The most recent snapshot; the catalog is never empty.
    pub fn latest_snapshot(&self) -> &IndexSnapshot {
        &self.snapshots[0]
    }

    /// CDX endpoint of a snapshot, e.g. `<server>/CC-MAIN-2024-30-index`.
    pub fn index_url(&self, snapshot_id: &str) -> String {
        format!("{}/{}-index", self.config.index_server, snapshot_id)
    }

    fn as_source(&self) -> Weak<dyn Provider> {
        self.this.clone()
    }
}

#[async_trait]
impl<T: Transport + 'static> Provider for CommonCrawl<T> {
    fn name(&self) -> &'static str {
        "CommonCrawl"
    }

    fn decode_page(&self, body: &[u8]) -> Result<Vec<CaptureRecord>> {
        decode_page(body, &self.as_source())
    }

    async fn count_pages(&self, url: &str) -> Result<u32> {
        self.count_pages_in(url, &self.latest_snapshot().id).await
    }

    async fn fetch_all_pages(
        &self,
        config: &RequestConfig,
        cancel: &Cancellation,
    ) -> std::result::Result<Vec<CaptureRecord>, PartialResults> {
        self.fetch_all_pages_in(config, &self.latest_snapshot().id, cancel)
            .await
    }

    async fn stream_pages(
        &self,
        config: &RequestConfig,
        results: mpsc::Sender<Vec<CaptureRecord>>,
        errors: mpsc::Sender<Error>,
        cancel: &Cancellation,
    ) -> usize {
        self.stream_selected_pages(config, results, errors, cancel)
            .await
    }

    async fn fetch_payload(&self, record: &CaptureRecord) -> Result<Vec<u8>> {
        self.extractor.fetch_payload(record).await
    }
}
