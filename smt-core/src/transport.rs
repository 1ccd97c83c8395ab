//! HTTP transport to the SMT platform
//!
//! One POST per call with a fixed timeout. Any failure on the wire, a non-2xx
//! status or an undecodable body is surfaced as [`Error::Transport`] with the
//! original cause attached. There is no retry at this layer.

use crate::config::ClientConfig;
use crate::request::WireRequest;
use crate::{Error, Result};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// POST client bound to a platform base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport from a validated configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full endpoint URL with the request parameters in the query string
    fn build_request_url(&self, request: &WireRequest) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, request.path);
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("Invalid endpoint URL '{}': {}", raw, e)))?;

        url.query_pairs_mut().extend_pairs(request.query_pairs());

        Ok(url)
    }

    /// Send `request` and return the decoded JSON body
    pub async fn post(&self, request: &WireRequest) -> Result<Value> {
        let url = self.build_request_url(request)?;

        debug!(path = request.path, "POST {}", url);

        let response = self
            .client
            .post(url)
            .send()
            .await?
            .error_for_status()?;

        let status = response.status();
        let body: Value = response.json().await?;

        debug!(path = request.path, %status, "Response decoded");
        Ok(body)
    }
}
