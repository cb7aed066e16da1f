//! Writes streamed captures to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cdx::CaptureRecord;
use crate::error::{Error, Result};

/// Drain record batches, fetch every payload and save it under `output_dir`.
///
/// Failures of single records are sent to `errors` and skipped. Sleeps
/// `download_rate` after each saved file. Returns the number of files
/// written once `results` is closed.
pub async fn save_files(
    mut results: mpsc::Receiver<Vec<CaptureRecord>>,
    output_dir: &Path,
    errors: mpsc::Sender<Error>,
    download_rate: Duration,
) -> usize {
    let mut saved = 0;

    while let Some(batch) = results.recv().await {
        for record in batch {
            match save_record(&record, output_dir).await {
                Ok(path) => {
                    debug!(path = %path.display(), "saved capture");
                    saved += 1;
                }
                Err(e) => {
                    warn!(url = %record.original, error = %e, "cannot save capture");
                    if errors.send(e).await.is_err() {
                        debug!("error receiver dropped");
                    }
                    continue;
                }
            }

            if !download_rate.is_zero() {
                tokio::time::sleep(download_rate).await;
            }
        }
    }

    info!(saved, dir = %output_dir.display(), "finished saving captures");
    saved
}

async fn save_record(record: &CaptureRecord, output_dir: &Path) -> Result<PathBuf> {
    let provider = record.provider().ok_or(Error::ProviderGone)?;
    let data = provider.fetch_payload(record).await?;

    let extension = extension_for_mime(&record.mime_type)
        .ok_or_else(|| Error::UnknownMimeType(record.mime_type.clone()))?;
    let path = output_dir.join(file_name(record, provider.name(), extension));

    fs::write(&path, data).await?;
    Ok(path)
}

/// `<original>-<timestamp>-<provider><ext>`, query-escaped so URLs map to
/// flat file names.
pub fn file_name(record: &CaptureRecord, provider: &str, extension: &str) -> String {
    query_escape(&format!(
        "{}-{}-{}{}",
        record.original, record.timestamp, provider, extension
    ))
}

/// Escape like an HTML form value: unreserved bytes stay, space becomes
/// `+`, everything else is `%XX`.
pub fn query_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                escaped.push(byte as char)
            }
            b' ' => escaped.push('+'),
            _ => escaped.push_str(&format!("%{byte:02X}")),
        }
    }
    escaped
}

/// File extension (with leading dot) for a MIME type; parameters such as
/// `; charset=utf-8` are ignored.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
    let extension = match essence.as_str() {
        "text/html" => ".html",
        "application/xhtml+xml" => ".xhtml",
        "text/plain" => ".txt",
        "text/css" => ".css",
        "text/csv" => ".csv",
        "text/xml" | "application/xml" => ".xml",
        "text/javascript" | "application/javascript" | "application/x-javascript" => ".js",
        "application/json" => ".json",
        "application/ld+json" => ".jsonld",
        "application/rss+xml" => ".rss",
        "application/atom+xml" => ".atom",
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "application/gzip" | "application/x-gzip" => ".gz",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/octet-stream" => ".bin",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "audio/mpeg" => ".mp3",
        "video/mp4" => ".mp4",
        "font/woff" => ".woff",
        "font/woff2" => ".woff2",
        _ => return None,
    };
    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_mime_types() {
        assert_eq!(extension_for_mime("text/html"), Some(".html"));
        assert_eq!(extension_for_mime("text/html; charset=UTF-8"), Some(".html"));
        assert_eq!(extension_for_mime("Application/PDF"), Some(".pdf"));
        assert_eq!(extension_for_mime("unk"), None);
        assert_eq!(extension_for_mime(""), None);
    }

    #[test]
    fn escapes_like_a_query_value() {
        assert_eq!(query_escape("a b~c"), "a+b~c");
        assert_eq!(
            query_escape("https://example.com/a?b=1"),
            "https%3A%2F%2Fexample.com%2Fa%3Fb%3D1"
        );
    }

    #[test]
    fn escapes_the_same_bytes_as_go_query_escape() {
        // Reference outputs of Go's url.QueryEscape
        assert_eq!(
            query_escape("my/cool+blog&about,stuff"),
            "my%2Fcool%2Bblog%26about%2Cstuff"
        );
        assert_eq!(query_escape("~user name"), "~user+name");
        assert_eq!(query_escape("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(query_escape("100% é"), "100%25+%C3%A9");
    }

    #[test]
    fn file_name_combines_url_timestamp_and_provider() {
        let record = CaptureRecord {
            original: "https://example.com/".to_string(),
            timestamp: "20240722120756".to_string(),
            ..CaptureRecord::default()
        };
        assert_eq!(
            file_name(&record, "CommonCrawl", ".html"),
            "https%3A%2F%2Fexample.com%2F-20240722120756-CommonCrawl.html"
        );
    }

    #[tokio::test]
    async fn detached_records_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (results_tx, results_rx) = mpsc::channel(4);
        let (errors_tx, mut errors_rx) = mpsc::channel(4);

        results_tx
            .send(vec![CaptureRecord {
                mime_type: "text/html".to_string(),
                ..CaptureRecord::default()
            }])
            .await
            .unwrap();
        drop(results_tx);

        let saved = save_files(results_rx, dir.path(), errors_tx, Duration::ZERO).await;
        assert_eq!(saved, 0);
        assert!(matches!(errors_rx.recv().await, Some(Error::ProviderGone)));
        assert!(errors_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn keeps_draining_when_error_receiver_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let (results_tx, results_rx) = mpsc::channel(4);
        let (errors_tx, errors_rx) = mpsc::channel(1);
        drop(errors_rx);

        for _ in 0..2 {
            results_tx.send(vec![CaptureRecord::default()]).await.unwrap();
        }
        drop(results_tx);

        let saved = save_files(results_rx, dir.path(), errors_tx, Duration::ZERO).await;
        assert_eq!(saved, 0);
    }
}
