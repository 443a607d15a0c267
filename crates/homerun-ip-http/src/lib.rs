// # HTTP IP Resolver
//
// This crate provides the HTTP-based public IP resolver for homerun.
//
// ## Protocol
//
// A single GET against the configured `ip_server`. The endpoint must answer
// `200 OK` with the address as the body; one trailing newline (or CRLF) is
// tolerated. The body is otherwise passed through verbatim, so the endpoint
// decides what kind of address is returned.
//
// ## No Caching
//
// Every call hits the endpoint. The scheduler only resolves once per cycle,
// and the provider is the source of truth for what is currently published.

use homerun_core::traits::IpResolver;
use homerun_core::{Error, Result};

use std::time::Duration;

use reqwest::StatusCode;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Public IP resolver backed by a plain-text HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint returning the caller's address as plain text
    ///   (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_unavailable(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("IP endpoint {} answered {}", self.url, status);
            return Err(Error::ip_unavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_unavailable(format!("Failed to read response: {}", e)))?;

        let ip = strip_line_ending(&body);
        if ip.is_empty() {
            return Err(Error::ip_unavailable("Empty response body"));
        }

        Ok(ip.to_string())
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Strip line terminators from both ends, leaving other whitespace alone
fn strip_line_ending(body: &str) -> &str {
    body.trim_matches(|c| c == '\n' || c == '\r')
}
