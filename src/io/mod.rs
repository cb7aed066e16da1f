pub(crate) mod client;
mod http;

pub use client::{ResilientClient, user_agent};
pub use http::HttpTransport;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for issuing a single GET request against a remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one GET with the given per-request timeout and extra headers.
    ///
    /// Only transport failures (connect, timeout, body read) are errors here;
    /// any HTTP status is returned as a response.
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse>;
}
