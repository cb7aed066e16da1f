//! Index snapshot catalog.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::{ResilientClient, Transport};

/// Timestamp layout used by `collinfo.json` (no timezone suffix).
const CATALOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn catalog_time<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, CATALOG_TIME_FORMAT).map_err(serde::de::Error::custom)
}

/// One crawl snapshot of the index, e.g. `CC-MAIN-2024-30`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub id: String,
    pub name: String,
    pub timegate: String,
    #[serde(rename = "cdx-api")]
    pub cdx_api: String,
    #[serde(deserialize_with = "catalog_time")]
    pub from: NaiveDateTime,
    #[serde(deserialize_with = "catalog_time")]
    pub to: NaiveDateTime,
}

/// Answer of the `showNumPages=true` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
    pub pages: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    pub blocks: u32,
}

/// Decode a catalog document, keeping the server's order (newest first).
pub fn parse_catalog(body: &[u8]) -> Result<Vec<IndexSnapshot>> {
    let snapshots: Vec<IndexSnapshot> = serde_json::from_slice(body).map_err(|source| {
        debug!(response = %String::from_utf8_lossy(body), "undecodable catalog");
        Error::Json {
            context: "index catalog",
            source,
        }
    })?;

    if snapshots.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    Ok(snapshots)
}

pub fn parse_page_count(body: &[u8]) -> Result<PageCount> {
    serde_json::from_slice(body).map_err(|source| Error::Json {
        context: "page count",
        source,
    })
}

/// Fetch `<index_server>/collinfo.json` and decode it.
pub async fn resolve_catalog<T: Transport>(
    client: &ResilientClient<T>,
    index_server: &str,
    timeout: Duration,
    max_retries: u32,
) -> Result<Vec<IndexSnapshot>> {
    let url = format!("{index_server}/collinfo.json");
    let body = client.fetch(&url, timeout, max_retries).await?;
    let snapshots = parse_catalog(&body)?;
    info!(
        count = snapshots.len(),
        latest = %snapshots[0].id,
        "resolved index catalog"
    );
    Ok(snapshots)
}

/// Pick the snapshots a date-bounded query should run against.
///
/// Without bounds only the first (most recent) snapshot is used. Otherwise a
/// snapshot is dropped when `from` is after its start or `to` is before its
/// end; bounds are not intersected with the snapshot interval.
pub fn select_snapshots<'a>(
    snapshots: &'a [IndexSnapshot],
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Vec<&'a IndexSnapshot> {
    if from.is_none() && to.is_none() {
        return snapshots.iter().take(1).collect();
    }

    snapshots
        .iter()
        .filter(|snapshot| !from.is_some_and(|from| from > snapshot.from))
        .filter(|snapshot| !to.is_some_and(|to| to < snapshot.to))
        .collect()
}
