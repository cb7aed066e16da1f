//! # cdxfetch
//!
//! Fetch archived web captures from the Common Crawl CDX index.
//!
//! This library resolves which crawl snapshots cover a query, paginates
//! through the remote CDX API, decodes the newline-delimited capture records
//! and, on demand, downloads a single capture from bulk storage with an HTTP
//! Range request before unpacking its WARC record.
//!
//! ## Features
//!
//! - Snapshot catalog resolution with date-window selection
//! - Retrying index requests with linear backoff
//! - Bounded (collect everything) and streaming (one channel batch per page)
//!   pagination, both cancellable
//! - Range-based WARC extraction of single captures, gzip members included
//!
//! ## Example
//!
//! ```no_run
//! use cdxfetch::{Cancellation, CommonCrawl, CommonCrawlConfig, Provider, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Resolve the snapshot catalog once
//!     let provider = CommonCrawl::new(CommonCrawlConfig::default()).await?;
//!
//!     // List captures of the latest snapshot
//!     let config = RequestConfig::new("example.com/*")
//!         .with_filter("=status:200")
//!         .with_limit(10);
//!     let records = provider.fetch_all_pages(&config, &Cancellation::never()).await?;
//!
//!     // Download the first capture
//!     if let Some(record) = records.first() {
//!         let payload = record.fetch_payload().await?;
//!         println!("{} bytes from {}", payload.len(), record.original);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cdx;
pub mod cli;
pub mod commoncrawl;
pub mod error;
pub mod io;
pub mod provider;
pub mod sink;
pub mod warc;

pub use cdx::{CaptureRecord, IndexSnapshot, RequestConfig};
pub use cli::Cli;
pub use commoncrawl::{CommonCrawl, CommonCrawlConfig};
pub use error::{Error, Result};
pub use io::{HttpTransport, ResilientClient, Transport};
pub use provider::{CancelHandle, Cancellation, PartialResults, Provider, spawn_stream};
pub use crate::warc::{WarcExtractor, WarcReader, WarcRecord};
