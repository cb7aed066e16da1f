use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::cdx::RequestConfig;
use crate::commoncrawl::CommonCrawlConfig;

#[derive(Parser, Debug)]
#[command(name = "cdxfetch")]
#[command(version)]
#[command(about = "Fetch archived web captures from the Common Crawl index", long_about = None)]
#[command(after_help = "Examples:\n  \
  cdxfetch urls 'example.com/*' -l 20                 list the 20 newest captures as JSON lines\n  \
  cdxfetch urls example.com -f =status:200 --from 20240101   list captures from 2024 snapshots\n  \
  cdxfetch download 'example.com/*' -f mimetype:text/html -d out   save HTML captures into out/")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Timeout of each request attempt, in seconds
    #[arg(short = 't', long, value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Attempts per index request
    #[arg(short = 'r', long, value_name = "N", default_value_t = 3, global = true)]
    pub retries: u32,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print capture records as JSON lines
    Urls(QueryArgs),

    /// Download captured payloads into a directory
    Download {
        #[command(flatten)]
        query: QueryArgs,

        /// Output directory
        #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Seconds to wait after each downloaded file
        #[arg(long, value_name = "SECS", default_value_t = 0.0)]
        rate: f64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// URL pattern, e.g. "example.com/*"
    #[arg(value_name = "URL")]
    pub url: String,

    /// CDX filter expression, repeatable (e.g. =status:200)
    #[arg(short = 'f', long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Maximum number of results (0 = unlimited)
    #[arg(short = 'l', long, default_value_t = 0)]
    pub limit: u32,

    /// Column to collapse duplicate captures on (e.g. urlkey, digest)
    #[arg(short = 'c', long = "collapse", value_name = "COLUMN")]
    pub collapse: Option<String>,

    /// Only captures from this date on
    #[arg(long = "from", value_name = "YYYYMMDD", value_parser = parse_date)]
    pub from: Option<NaiveDateTime>,

    /// Only captures up to this date
    #[arg(long = "to", value_name = "YYYYMMDD", value_parser = parse_date)]
    pub to: Option<NaiveDateTime>,

    /// Fetch the first page only
    #[arg(short = 's', long)]
    pub single_page: bool,
}

/// Parse `YYYYMMDD` into midnight of that day.
fn parse_date(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date '{value}', expected YYYYMMDD"))
}

impl QueryArgs {
    pub fn request_config(&self) -> RequestConfig {
        RequestConfig {
            url: self.url.clone(),
            filters: self.filters.clone(),
            limit: self.limit,
            collapse_column: self.collapse.clone(),
            single_page: self.single_page,
            from_date: self.from,
            to_date: self.to,
        }
    }
}

impl Cli {
    pub fn query(&self) -> &QueryArgs {
        match &self.command {
            Command::Urls(query) => query,
            Command::Download { query, .. } => query,
        }
    }

    pub fn provider_config(&self) -> CommonCrawlConfig {
        CommonCrawlConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.retries)
    }

    /// Pause between downloaded files; zero for `urls` or a negative rate.
    pub fn download_rate(&self) -> Duration {
        match &self.command {
            Command::Download { rate, .. } => {
                Duration::try_from_secs_f64(*rate).unwrap_or(Duration::ZERO)
            }
            Command::Urls(_) => Duration::ZERO,
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => "info",
            1 => "warn",
            _ => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_request_config_from_arguments() {
        let cli = Cli::try_parse_from([
            "cdxfetch",
            "urls",
            "example.com/*",
            "-f",
            "=status:200",
            "-f",
            "mimetype:text/html",
            "-l",
            "5",
            "--collapse",
            "urlkey",
            "--from",
            "20240701",
        ])
        .unwrap();

        let config = cli.query().request_config();
        assert_eq!(config.url, "example.com/*");
        assert_eq!(config.filters, ["=status:200", "mimetype:text/html"]);
        assert_eq!(config.limit, 5);
        assert_eq!(config.collapse_column.as_deref(), Some("urlkey"));
        assert_eq!(config.from_date, parse_date("20240701").ok());
        assert_eq!(config.to_date, None);
        assert!(!config.single_page);
        assert_eq!(cli.download_rate(), Duration::ZERO);
    }

    #[test]
    fn download_subcommand_and_global_flags() {
        let cli = Cli::try_parse_from([
            "cdxfetch", "download", "example.com", "-d", "out", "--rate", "0.5", "-t", "10",
            "-r", "5", "-q",
        ])
        .unwrap();

        assert_eq!(cli.download_rate(), Duration::from_millis(500));
        assert_eq!(cli.provider_config().timeout, Duration::from_secs(10));
        assert_eq!(cli.provider_config().max_retries, 5);
        assert_eq!(cli.log_level(), "warn");
        match cli.command {
            Command::Download { output_dir, .. } => assert_eq!(output_dir, PathBuf::from("out")),
            Command::Urls(_) => panic!("expected download command"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("2024-07-01").is_err());
        assert!(parse_date("20241301").is_err());
        assert!(Cli::try_parse_from(["cdxfetch", "urls", "x", "--to", "yesterday"]).is_err());
    }
}
