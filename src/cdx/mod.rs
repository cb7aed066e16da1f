//! CDX index data model.
//!
//! The index server publishes a catalog of crawl snapshots
//! (`collinfo.json`) and, per snapshot, a CDX query API answering with
//! newline-delimited JSON capture records.
//!
//! - [`catalog`]: snapshot catalog decoding and date-range selection
//! - [`query`]: caller query parameters and query-string construction
//! - [`record`]: capture records and page decoding

pub mod catalog;
pub mod query;
pub mod record;

pub use catalog::{IndexSnapshot, PageCount, select_snapshots};
pub use query::RequestConfig;
pub use record::{CaptureRecord, decode_page};
