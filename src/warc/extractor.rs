use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cdx::CaptureRecord;
use crate::error::{Error, Result};
use crate::io::{ResilientClient, Transport};

use super::parser::WarcReader;
use super::structures::WarcRecord;

/// Inclusive byte range sent in a `Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Range for a capture of `length` bytes at `offset`.
    ///
    /// The end is `offset + length + 1`: two bytes past the record, which the
    /// gzip member framing tolerates. `None` on overflow.
    pub fn for_capture(offset: u64, length: u64) -> Option<Self> {
        let end = offset.checked_add(length)?.checked_add(1)?;
        Some(Self { start: offset, end })
    }

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Fetches single captures from bulk storage with Range requests
pub struct WarcExtractor<T: Transport> {
    client: Arc<ResilientClient<T>>,
    storage_root: String,
    timeout: Duration,
}

impl<T: Transport> WarcExtractor<T> {
    pub fn new(client: Arc<ResilientClient<T>>, storage_root: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            storage_root: storage_root.into(),
            timeout,
        }
    }

    /// Byte range holding `record` inside its storage file.
    pub fn range_for(record: &CaptureRecord) -> Result<ByteRange> {
        let offset = record.offset()?;
        let length = record.length()?;
        ByteRange::for_capture(offset, length).ok_or_else(|| Error::InvalidRecord {
            field: "length",
            value: record.length.clone(),
        })
    }

    pub fn storage_url(&self, record: &CaptureRecord) -> String {
        format!("{}/{}", self.storage_root, record.filename)
    }

    /// Download the WARC record a capture points at.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRecord`] if offset or length are not decimal numbers
    /// - [`Error::RangeFetch`] if the storage request fails
    /// - [`Error::ContainerDecode`] / [`Error::TruncatedRecord`] if the
    ///   returned bytes are not one complete WARC record
    pub async fn fetch_record(&self, record: &CaptureRecord) -> Result<WarcRecord> {
        let range = Self::range_for(record)?;
        let url = self.storage_url(record);
        let headers = [("Range", range.header_value())];

        let body = self
            .client
            .fetch_with_headers(&url, self.timeout, &headers)
            .await
            .map_err(|e| Error::RangeFetch {
                url: url.clone(),
                source: Box::new(e),
            })?;

        debug!(
            url = %url,
            start = range.start,
            end = range.end,
            received = body.len(),
            "fetched capture range"
        );

        WarcReader::new(&body)?.first_record()
    }

    /// Download a capture and return its content block.
    pub async fn fetch_payload(&self, record: &CaptureRecord) -> Result<Vec<u8>> {
        Ok(self.fetch_record(record).await?.content)
    }
}
