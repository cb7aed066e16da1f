//! WARC record reader.
//!
//! Input starting with the gzip magic is inflated first. Only the first gzip
//! member is decoded, since a ranged storage read ends a couple of bytes
//! into the next member. Record framing is left to the `warc` crate.

use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::{self, Read};
use ::warc::WarcHeader;

use crate::error::{Error, Result};

use super::structures::*;

/// Records of one in-memory WARC stream.
///
/// ## Example
///
/// ```ignore
/// let reader = WarcReader::new(&bytes)?;
/// for record in reader.records() {
///     let record = record?;
///     println!("{:?} {}", record.target_uri, record.content.len());
/// }
/// ```
pub struct WarcReader {
    data: Vec<u8>,
}

impl WarcReader {
    /// Open a reader over `data`, inflating it when gzip-compressed.
    ///
    /// # Errors
    ///
    /// [`Error::TruncatedRecord`] if the gzip member ends early,
    /// [`Error::ContainerDecode`] if it is otherwise corrupt.
    pub fn new(data: &[u8]) -> Result<Self> {
        let data = if data.starts_with(GZIP_MAGIC) {
            inflate_first_member(data)?
        } else {
            data.to_vec()
        };

        Ok(Self { data })
    }

    /// Iterate over the records in stream order.
    ///
    /// Framing and header errors reported by the `warc` parser surface as
    /// [`Error::ContainerDecode`].
    pub fn records(&self) -> impl Iterator<Item = Result<WarcRecord>> + '_ {
        ::warc::WarcReader::new(self.data.as_slice())
            .iter_records()
            .map(|record| {
                let record = record.map_err(|e| Error::ContainerDecode(e.to_string()))?;
                Ok(WarcRecord {
                    record_type: record.header(WarcHeader::WarcType).map(Cow::into_owned),
                    target_uri: record.header(WarcHeader::TargetURI).map(Cow::into_owned),
                    content: record.body().to_vec(),
                })
            })
    }

    /// Read the first record of the stream.
    ///
    /// # Errors
    ///
    /// As [`records`](Self::records), plus [`Error::ContainerDecode`] for a
    /// stream holding no record at all.
    pub fn first_record(&self) -> Result<WarcRecord> {
        self.records().next().unwrap_or_else(|| {
            Err(Error::ContainerDecode(
                "stream holds no WARC record".to_string(),
            ))
        })
    }
}

fn inflate_first_member(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut inflated = Vec::new();

    match decoder.read_to_end(&mut inflated) {
        Ok(_) => Ok(inflated),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::TruncatedRecord(
            format!("gzip member ends early: {e}"),
        )),
        Err(e) => Err(Error::ContainerDecode(format!(
            "cannot inflate gzip member: {e}"
        ))),
    }
}
