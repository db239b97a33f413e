//! `reqwest`-backed implementation of the outbound HTTP provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use nav_core::HttpRequest;
use tracing::trace;

const USER_AGENT: &str = concat!("voyage/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpRequest for HttpClient {
    async fn fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>> {
        let request = reqwest::Request::try_from(request).context("converting request")?;
        let url = request.url().to_string();
        trace!(url = %url, method = %request.method(), "sending request");

        let response =
            self.client.execute(request).await.with_context(|| format!("requesting {url}"))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.context("reading response body")?;
        trace!(url = %url, status = %status, bytes = body.len(), "received response");

        let mut reply = Response::new(body);
        *reply.status_mut() = status;
        *reply.headers_mut() = headers;
        Ok(reply)
    }
}
