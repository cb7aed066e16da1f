//! Retrying GET client on top of a [`Transport`].
//!
//! Two entry points mirror the two ways the index and storage tiers are used:
//!
//! - [`ResilientClient::fetch`] retries index queries with linear backoff
//!   until one attempt returns HTTP 200.
//! - [`ResilientClient::fetch_with_headers`] performs a single attempt with
//!   caller headers (used for ranged storage reads) and classifies the status.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{HttpResponse, Transport};
use crate::error::{Error, Result};

/// Browser identities rotated across storage requests.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Pick a random browser User-Agent string.
pub fn user_agent() -> &'static str {
    USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
}

/// GET client with per-attempt timeouts and linear retry backoff
pub struct ResilientClient<T: Transport> {
    transport: T,
    backoff_unit: Duration,
}

impl<T: Transport> ResilientClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Set the base delay; attempt `k` is followed by a sleep of `k` units.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Delay slept after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }

    /// GET `url` until an attempt returns HTTP 200, at most `max_retries`
    /// attempts (a budget of zero still makes one attempt).
    ///
    /// When every attempt fails, the failure of the last attempt is returned.
    pub async fn fetch(&self, url: &str, timeout: Duration, max_retries: u32) -> Result<Vec<u8>> {
        let attempts = max_retries.max(1);
        let mut attempt = 1;

        loop {
            debug!(url, ?timeout, attempt, attempts, "GET");

            let err = match self.transport.get(url, timeout, &[]).await {
                Ok(resp) if resp.status == 200 => return Ok(resp.body),
                Ok(resp) => Error::UpstreamStatus {
                    url: url.to_string(),
                    status: resp.status,
                },
                Err(e) => e,
            };

            if attempt >= attempts {
                return Err(err);
            }

            let delay = self.backoff(attempt);
            warn!(url, attempt, attempts, error = %err, ?delay, "attempt failed, retrying");
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Single GET with extra headers and a random User-Agent.
    ///
    /// 500 is fatal, 503 hands back the body inside [`Error::Throttled`],
    /// any other status is accepted when it carries a body (so `206 Partial
    /// Content` passes), and an empty non-200 response is an error.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        let mut all_headers: Vec<(&str, String)> = Vec::with_capacity(headers.len() + 1);
        if !headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        {
            all_headers.push(("User-Agent", user_agent().to_string()));
        }
        all_headers.extend(headers.iter().cloned());

        debug!(url, ?timeout, "GET with headers");
        let HttpResponse { status, body } = self.transport.get(url, timeout, &all_headers).await?;

        match status {
            500 => Err(Error::SlowDown {
                url: url.to_string(),
            }),
            503 => Err(Error::Throttled {
                url: url.to_string(),
                body,
            }),
            _ if !body.is_empty() => Ok(body),
            200 => Ok(body),
            status => Err(Error::UpstreamStatus {
                url: url.to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Transport replaying a fixed script of outcomes and recording calls.
    pub(crate) struct ScriptedTransport {
        script: Mutex<VecDeque<Result<HttpResponse>>>,
        pub calls: Mutex<Vec<(Instant, Vec<(String, String)>)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: Vec<Result<HttpResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            _timeout: Duration,
            headers: &[(&str, String)],
        ) -> Result<HttpResponse> {
            self.calls.lock().unwrap().push((
                Instant::now(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request to {url}"))
        }
    }

    fn connect_error() -> Result<HttpResponse> {
        Err(Error::Network {
            url: "http://index.test/".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_retries_until_success_with_linear_backoff() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![
            connect_error(),
            Ok(HttpResponse::new(502, "bad gateway")),
            Ok(HttpResponse::new(200, "ok")),
        ]));

        let body = client
            .fetch("http://index.test/", Duration::from_secs(5), 5)
            .await
            .unwrap();
        assert_eq!(body, b"ok");

        let calls = client.transport().calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].0 - calls[0].0, Duration::from_secs(1));
        assert_eq!(calls[2].0 - calls[1].0, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_returns_last_error_after_exhausting_retries() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![
            Ok(HttpResponse::new(503, "busy")),
            connect_error(),
        ]));

        let err = client
            .fetch("http://index.test/", Duration::from_secs(5), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert_eq!(client.transport().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_reports_status_of_last_failed_response() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![
            connect_error(),
            Ok(HttpResponse::new(404, "")),
        ]));

        let err = client
            .fetch("http://index.test/", Duration::from_secs(5), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retry_budget_still_makes_one_attempt() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![Ok(HttpResponse::new(
            200, "ok",
        ))]));

        let body = client
            .fetch("http://index.test/", Duration::from_secs(5), 0)
            .await
            .unwrap();
        assert_eq!(body, b"ok");
        assert_eq!(client.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn fetch_with_headers_classifies_status() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![
            Ok(HttpResponse::new(206, "partial")),
            Ok(HttpResponse::new(503, "some data")),
            Ok(HttpResponse::new(500, "ignored")),
            Ok(HttpResponse::new(404, "")),
            Ok(HttpResponse::new(200, "")),
        ]));
        let timeout = Duration::from_secs(5);
        let url = "http://data.test/file";

        assert_eq!(
            client.fetch_with_headers(url, timeout, &[]).await.unwrap(),
            b"partial"
        );
        match client.fetch_with_headers(url, timeout, &[]).await {
            Err(Error::Throttled { body, .. }) => assert_eq!(body, b"some data"),
            other => panic!("expected throttled error, got {other:?}"),
        }
        assert!(matches!(
            client.fetch_with_headers(url, timeout, &[]).await,
            Err(Error::SlowDown { .. })
        ));
        assert!(matches!(
            client.fetch_with_headers(url, timeout, &[]).await,
            Err(Error::UpstreamStatus { status: 404, .. })
        ));
        assert!(client.fetch_with_headers(url, timeout, &[]).await.unwrap().is_empty());
        assert_eq!(client.transport().call_count(), 5);
    }

    #[tokio::test]
    async fn fetch_with_headers_sends_user_agent_and_caller_headers() {
        let client = ResilientClient::new(ScriptedTransport::new(vec![Ok(HttpResponse::new(
            206, "x",
        ))]));

        client
            .fetch_with_headers(
                "http://data.test/file",
                Duration::from_secs(5),
                &[("Range", "bytes=0-10".to_string())],
            )
            .await
            .unwrap();

        let calls = client.transport().calls.lock().unwrap();
        let headers = &calls[0].1;
        let agent = headers
            .iter()
            .find(|(k, _)| k == "User-Agent")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert!(USER_AGENTS.contains(&agent));
        assert!(headers.contains(&("Range".to_string(), "bytes=0-10".to_string())));
    }
}
