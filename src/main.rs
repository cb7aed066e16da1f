//! Main entry point for the cdxfetch CLI application.
//!
//! Streams capture records of the selected index snapshots and either
//! prints them as JSON lines or downloads their payloads.

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cdxfetch::cli::Command;
use cdxfetch::sink::save_files;
use cdxfetch::{CaptureRecord, Cancellation, Cli, CommonCrawl, Error, spawn_stream};

/// Batches (pages) buffered between producer and consumer.
const CHANNEL_CAPACITY: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.log_level());

    let provider = CommonCrawl::new(cli.provider_config()).await?;
    let config = cli.query().request_config();

    // Ctrl-C stops pagination; batches already queued are still consumed
    let (cancel_handle, cancel) = Cancellation::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping pagination");
            cancel_handle.cancel();
        }
    });

    let (results_tx, results_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (errors_tx, errors_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let error_logger = tokio::spawn(log_errors(errors_rx));

    let sink_errors = errors_tx.clone();
    let producer = spawn_stream(provider.clone(), config, results_tx, errors_tx, cancel);

    match &cli.command {
        Command::Urls(_) => {
            drop(sink_errors);
            print_records(results_rx).await?;
        }
        Command::Download { output_dir, .. } => {
            tokio::fs::create_dir_all(output_dir).await?;
            save_files(results_rx, output_dir, sink_errors, cli.download_rate()).await;
        }
    }

    let emitted = producer.await?;
    let failures = error_logger.await?;
    info!(records = emitted, failures, "done");

    Ok(())
}

/// Install a stderr `fmt` subscriber; `RUST_LOG` overrides `default_level`.
fn setup_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write every record as one JSON line on stdout.
async fn print_records(mut results: mpsc::Receiver<Vec<CaptureRecord>>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(batch) = results.recv().await {
        for record in batch {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
        }
    }
    stdout.flush().await?;
    Ok(())
}

/// Log reported failures until every sender is gone; returns their count.
async fn log_errors(mut errors: mpsc::Receiver<Error>) -> usize {
    let mut count = 0;
    while let Some(error) = errors.recv().await {
        warn!(%error, "request failed");
        count += 1;
    }
    count
}
