/// Leading bytes of a gzip member
pub const GZIP_MAGIC: &[u8] = b"\x1f\x8b";

/// The parts of a WARC record a capture download needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarcRecord {
    /// `WARC-Type`, e.g. `response`
    pub record_type: Option<String>,
    /// `WARC-Target-URI`
    pub target_uri: Option<String>,
    /// Content block (for `response` records: HTTP headers followed by the body)
    pub content: Vec<u8>,
}
