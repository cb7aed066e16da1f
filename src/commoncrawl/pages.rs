//! CDX pagination for [`CommonCrawl`].
//!
//! Pages of one snapshot are always requested in increasing page order. The
//! bounded variant gives up on the first failing page; the streaming
//! variant reports failures and keeps going. Every remote request and
//! channel send gives way to cancellation.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::CommonCrawl;
use crate::cdx::catalog::parse_page_count;
use crate::cdx::{CaptureRecord, RequestConfig, select_snapshots};
use crate::error::{Error, Result};
use crate::io::Transport;
use crate::provider::{Cancellation, PartialResults, Provider};

impl<T: Transport + 'static> CommonCrawl<T> {
    /// Number of CDX pages `snapshot_id` holds for `url`.
    pub async fn count_pages_in(&self, url: &str, snapshot_id: &str) -> Result<u32> {
        let request_url = format!(
            "{}?url={url}&showNumPages=true",
            self.index_url(snapshot_id)
        );
        let body = self
            .client
            .fetch(&request_url, self.config.timeout, self.config.max_retries)
            .await?;
        let count = parse_page_count(&body)?;
        debug!(
            snapshot = snapshot_id,
            pages = count.pages,
            page_size = count.page_size,
            blocks = count.blocks,
            "counted pages"
        );
        Ok(count.pages)
    }

    /// Fetch all pages of one snapshot, stopping once `config.limit` records
    /// have been collected.
    ///
    /// Any failing page ends the call; the records collected before it are
    /// handed back in [`PartialResults`].
    pub async fn fetch_all_pages_in(
        &self,
        config: &RequestConfig,
        snapshot_id: &str,
        cancel: &Cancellation,
    ) -> std::result::Result<Vec<CaptureRecord>, PartialResults> {
        let mut records = Vec::new();

        let pages = match self.page_total(config, snapshot_id, cancel).await {
            Ok(pages) => pages,
            Err(error) => return Err(PartialResults { records, error }),
        };

        let index_url = self.index_url(snapshot_id);
        for page in 0..pages {
            let batch = match self.fetch_page(config, &index_url, page, cancel).await {
                Ok(batch) => batch,
                Err(error) => return Err(PartialResults { records, error }),
            };
            records.extend(batch);

            if config.limit_reached(records.len()) {
                debug!(limit = config.limit, fetched = records.len(), "limit reached");
                break;
            }
        }

        Ok(records)
    }

    /// Stream pages of every snapshot selected by the query's date window.
    ///
    /// Each page is sent as one batch. Failures of page counting, requests or
    /// decoding are sent on `errors` and the loop moves on. Returns the
    /// number of records sent.
    pub async fn stream_selected_pages(
        &self,
        config: &RequestConfig,
        results: mpsc::Sender<Vec<CaptureRecord>>,
        errors: mpsc::Sender<Error>,
        cancel: &Cancellation,
    ) -> usize {
        let snapshots = select_snapshots(&self.snapshots, config.from_date, config.to_date);
        info!(
            snapshots = ?snapshots.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "selected index snapshots"
        );

        let mut emitted = 0;
        for snapshot in snapshots {
            if cancel.is_cancelled() {
                return emitted;
            }

            let pages = match self.page_total(config, &snapshot.id, cancel).await {
                Ok(pages) => pages,
                Err(Error::Cancelled) => return emitted,
                Err(e) => {
                    report(&errors, e, cancel).await;
                    continue;
                }
            };

            let index_url = self.index_url(&snapshot.id);
            for page in 0..pages {
                let batch = match self.fetch_page(config, &index_url, page, cancel).await {
                    Ok(batch) => batch,
                    Err(Error::Cancelled) => return emitted,
                    Err(e) => {
                        report(&errors, e, cancel).await;
                        continue;
                    }
                };

                let count = batch.len();
                match until_cancelled(cancel, results.send(batch)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => {
                        debug!("results receiver dropped, stopping");
                        return emitted;
                    }
                    Err(_) => return emitted,
                }
                emitted += count;

                if config.limit_reached(emitted) {
                    debug!(limit = config.limit, emitted, "limit reached");
                    return emitted;
                }
            }
        }

        emitted
    }

    async fn page_total(
        &self,
        config: &RequestConfig,
        snapshot_id: &str,
        cancel: &Cancellation,
    ) -> Result<u32> {
        if config.single_page {
            return Ok(1);
        }
        until_cancelled(cancel, self.count_pages_in(&config.url, snapshot_id)).await?
    }

    /// Request and decode one page, racing it against cancellation.
    async fn fetch_page(
        &self,
        config: &RequestConfig,
        index_url: &str,
        page: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<CaptureRecord>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let url = config.query_url(index_url, page);
        let body = until_cancelled(
            cancel,
            self.client
                .fetch(&url, self.config.timeout, self.config.max_retries),
        )
        .await??;

        let records = self.decode_page(&body)?;
        debug!(page, records = records.len(), "decoded page");
        Ok(records)
    }
}

/// Drive `future` to completion unless `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &Cancellation, future: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        output = future => Ok(output),
    }
}

async fn report(errors: &mpsc::Sender<Error>, error: Error, cancel: &Cancellation) {
    warn!(%error, "page failed");
    match until_cancelled(cancel, errors.send(error)).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => debug!("error receiver dropped"),
        Err(_) => debug!("cancelled while reporting"),
    }
}
