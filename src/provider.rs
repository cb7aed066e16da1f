//! Archive provider capability and streaming helpers.
//!
//! A [`Provider`] is one archive back-end. The orchestration entry points
//! take a [`Cancellation`] so a caller can abort a long pagination, and
//! [`spawn_stream`] runs [`Provider::stream_pages`] on its own task so the
//! result and error channels close exactly when streaming is over.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cdx::{CaptureRecord, RequestConfig};
use crate::error::{Error, Result};

/// Records accumulated by a bounded fetch before it failed
#[derive(Debug, thiserror::Error)]
#[error("page fetch aborted after {} records", .records.len())]
pub struct PartialResults {
    pub records: Vec<CaptureRecord>,
    #[source]
    pub error: Error,
}

/// A web-archive back-end able to list captures and fetch their payloads
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in output file names.
    fn name(&self) -> &'static str;

    /// Decode one CDX response page into records pointing back at `self`.
    fn decode_page(&self, body: &[u8]) -> Result<Vec<CaptureRecord>>;

    /// Number of CDX pages the latest snapshot holds for `url`.
    async fn count_pages(&self, url: &str) -> Result<u32>;

    /// Fetch every page of the latest snapshot, stopping at `config.limit`.
    ///
    /// The first failing page aborts the call; records gathered so far are
    /// returned inside the error.
    async fn fetch_all_pages(
        &self,
        config: &RequestConfig,
        cancel: &Cancellation,
    ) -> std::result::Result<Vec<CaptureRecord>, PartialResults>;

    /// Stream one batch per page across every snapshot matching the query's
    /// date window.
    ///
    /// Page failures go to `errors` and do not stop the loop. Returns the
    /// number of records sent once pagination ends, the limit is reached,
    /// the results receiver is dropped or `cancel` fires; the senders are
    /// dropped on return.
    async fn stream_pages(
        &self,
        config: &RequestConfig,
        results: mpsc::Sender<Vec<CaptureRecord>>,
        errors: mpsc::Sender<Error>,
        cancel: &Cancellation,
    ) -> usize;

    /// Download and unpack the archived payload of `record`.
    async fn fetch_payload(&self, record: &CaptureRecord) -> Result<Vec<u8>>;
}

/// Observer side of a cancellation signal
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Trigger side of a cancellation signal
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Cancellation { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Cancellation {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested; pending forever if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Run [`Provider::stream_pages`] on a new task that owns both senders.
///
/// Consumers see their channels close when the task ends; the handle yields
/// the number of records emitted.
pub fn spawn_stream(
    provider: Arc<dyn Provider>,
    config: RequestConfig,
    results: mpsc::Sender<Vec<CaptureRecord>>,
    errors: mpsc::Sender<Error>,
    cancel: Cancellation,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        provider
            .stream_pages(&config, results, errors, &cancel)
            .await
    })
}
