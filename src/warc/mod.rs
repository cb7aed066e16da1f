//! WARC record reading and ranged extraction.
//!
//! Common Crawl stores captures in large `.warc.gz` files made of one gzip
//! member per WARC record. A CDX record's `offset` and `length` locate that
//! member, so a single HTTP Range request recovers one capture without
//! downloading the whole file.
//!
//! ## Architecture
//!
//! - [`structures`]: the record view handed to callers
//! - [`parser`]: gzip inflation and record iteration on top of the `warc` crate
//! - [`extractor`]: range arithmetic and the storage request for one capture
//!
//! ## Limitations
//!
//! - Only the first record of a range is used for extraction
//! - Segmented (`continuation`) records are not reassembled

mod extractor;
mod parser;
mod structures;

pub use extractor::{ByteRange, WarcExtractor};
pub use parser::WarcReader;
pub use structures::*;
