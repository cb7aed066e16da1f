use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::provider::Provider;

/// One capture returned by the CDX API.
///
/// Numeric fields are kept as the decimal strings the server sends; use
/// [`CaptureRecord::offset`] and [`CaptureRecord::length`] to parse them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRecord {
    pub urlkey: String,
    pub timestamp: String,
    pub charset: String,
    #[serde(rename = "mime")]
    pub mime_type: String,
    pub languages: String,
    #[serde(rename = "mime-detected", alias = "mimedetected")]
    pub mime_detected: String,
    pub digest: String,
    pub offset: String,
    /// Original URL of the capture
    #[serde(rename = "url")]
    pub original: String,
    pub length: String,
    #[serde(rename = "status")]
    pub status_code: String,
    pub filename: String,
    /// Provider that decoded this record; never owns it.
    #[serde(skip)]
    pub source: Option<Weak<dyn Provider>>,
}

impl CaptureRecord {
    pub fn offset(&self) -> Result<u64> {
        parse_decimal("offset", &self.offset)
    }

    pub fn length(&self) -> Result<u64> {
        parse_decimal("length", &self.length)
    }

    /// The provider that produced this record, if it is still alive.
    pub fn provider(&self) -> Option<Arc<dyn Provider>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    /// Fetch the archived payload through the producing provider.
    pub async fn fetch_payload(&self) -> Result<Vec<u8>> {
        let provider = self.provider().ok_or(Error::ProviderGone)?;
        provider.fetch_payload(self).await
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| Error::InvalidRecord {
        field,
        value: value.to_string(),
    })
}

/// Decode a CDX page: one JSON capture object per line, the last line also
/// newline-terminated.
///
/// Fails on the first malformed line; every decoded record points back at
/// `provider`.
pub fn decode_page(body: &[u8], provider: &Weak<dyn Provider>) -> Result<Vec<CaptureRecord>> {
    if body.is_empty() {
        return Err(Error::EmptyResponse);
    }

    let body = body.strip_suffix(b"\n").unwrap_or(body);

    body.split(|&b| b == b'\n')
        .map(|line| {
            let mut record: CaptureRecord =
                serde_json::from_slice(line).map_err(|source| Error::Decode {
                    line: String::from_utf8_lossy(line).into_owned(),
                    source,
                })?;
            record.source = Some(provider.clone());
            Ok(record)
        })
        .collect()
}
