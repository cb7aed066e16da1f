use std::io;

/// Errors produced while resolving the index catalog, paginating CDX results
/// or extracting archived payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("server returned 500 status response for {url} (slow down)")]
    SlowDown { url: String },

    /// The body is kept so callers may still use the partial data.
    #[error("server returned 503 status response for {url}")]
    Throttled { url: String, body: Vec<u8> },

    #[error("got {status} status response from {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("empty response provided")]
    EmptyResponse,

    #[error("cannot decode JSON line: {source}. Response: {line}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    #[error("cannot decode {context}: {source}")]
    Json {
        context: &'static str,
        source: serde_json::Error,
    },

    #[error("invalid {field} '{value}' in capture record")]
    InvalidRecord { field: &'static str, value: String },

    #[error("range request for {url} failed: {source}")]
    RangeFetch { url: String, source: Box<Error> },

    #[error("cannot decode WARC record: {0}")]
    ContainerDecode(String),

    #[error("WARC record is truncated: {0}")]
    TruncatedRecord(String),

    #[error("index catalog is empty")]
    EmptyCatalog,

    #[error("capture record is no longer attached to a provider")]
    ProviderGone,

    #[error("operation cancelled")]
    Cancelled,

    #[error("cannot get extension for MIME type '{0}'")]
    UnknownMimeType(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
