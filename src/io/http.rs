use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{HttpResponse, Transport};
use crate::error::{Error, Result};

/// `reqwest`-backed transport shared by every request of a provider
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build().map_err(Error::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse> {
        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let resp = request.send().await.map_err(|e| Error::Network {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| Error::Network {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
