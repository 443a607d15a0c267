// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider`.
//
// ## Scope
//
// - One HTTP request per trait call; no retry, backoff or caching
//   (the scheduler owns retries by running the next cycle)
// - 30 second HTTP timeout on every request
// - Status codes mapped onto homerun's error variants (401/403, 429, other)
// - Dry-run mode: reads go out, writes are logged and synthesized
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or `Debug` output
// - Credentials are read from environment variables only
// - Missing credentials fail each call without sending a request
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use homerun_core::traits::{DnsProvider, DnsRecord, RecordPayload, RecordType, Zone};
use homerun_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare error codes that mean the credentials were rejected
const AUTH_ERROR_CODES: &[u32] = &[6003, 6103, 9106, 10000];

/// Provider name used in errors and logs
const PROVIDER: &str = "cloudflare";

/// Cloudflare API credentials
///
/// The `Debug` implementation never exposes the secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Scoped API token, sent as `Authorization: Bearer`
    ApiToken(String),

    /// Global API key plus account email, sent as `X-Auth-Key`/`X-Auth-Email`
    ApiKey {
        /// Account email
        email: String,
        /// Global API key
        key: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.debug_tuple("ApiToken").field(&"<REDACTED>").finish(),
            Credentials::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
        }
    }
}

impl Credentials {
    /// Read credentials from the process environment
    ///
    /// Looks for `CLOUDFLARE_API_TOKEN` or `CF_API_TOKEN` first, then the
    /// `CF_API_KEY` + `CF_API_EMAIL` pair. Empty values count as unset.
    ///
    /// # Returns
    ///
    /// - `Some(Credentials)`: A token or a complete key/email pair was found
    /// - `None`: Nothing usable is set
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(token) = get("CLOUDFLARE_API_TOKEN").or_else(|| get("CF_API_TOKEN")) {
            return Some(Credentials::ApiToken(token));
        }

        match (get("CF_API_KEY"), get("CF_API_EMAIL")) {
            (Some(key), Some(email)) => Some(Credentials::ApiKey { email, key }),
            _ => None,
        }
    }

    /// Attach the authentication headers to a request
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::ApiToken(token) => request.bearer_auth(token),
            Credentials::ApiKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }
}

/// Cloudflare API v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

/// One entry of the envelope's `errors` array
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: each trait call is one HTTP request.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Credentials; `None` makes every call fail with an authentication error
    credentials: Option<Credentials>,

    /// API base URL
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token or key/email pair; `None` is accepted so the
    ///   daemon can start and report the problem on every cycle
    /// - `dry_run`: If true, perform GET requests but skip writes
    pub fn new(credentials: Option<Credentials>, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider with credentials from the environment
    pub fn from_env(dry_run: bool) -> Result<Self> {
        Self::new(Credentials::from_env(), dry_run)
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether credentials were supplied
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Whether writes are only simulated
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate, send and decode one request
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::auth("No Cloudflare credentials configured (X-Auth headers missing)")
        })?;

        let response = credentials
            .apply(request)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, None, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::provider(
                PROVIDER,
                Some(status.as_u16()),
                format!("Failed to read response: {}", e),
            )
        })?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(map_failure(status, &[], &body)),
            Err(e) => {
                return Err(Error::provider(
                    PROVIDER,
                    Some(status.as_u16()),
                    format!("Failed to parse response: {}", e),
                ));
            }
        };

        if !status.is_success() || !envelope.success {
            return Err(map_failure(status, &envelope.errors, &body));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                PROVIDER,
                Some(status.as_u16()),
                "Invalid response format: result is missing",
            )
        })
    }
}

/// Map a failed response onto homerun's error variants
fn map_failure(status: StatusCode, errors: &[ApiError], body: &str) -> Error {
    let message = if errors.is_empty() {
        let body = body.trim();
        if body.is_empty() {
            status.to_string()
        } else {
            body.to_string()
        }
    } else {
        errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    };

    let rejected_credentials = errors.iter().any(|e| AUTH_ERROR_CODES.contains(&e.code))
        || message.contains("X-Auth");

    match status.as_u16() {
        401 | 403 => Error::auth(format!("{}. Status: {}", message, status)),
        _ if rejected_credentials => Error::auth(format!("{}. Status: {}", message, status)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        code => Error::provider(PROVIDER, Some(code), message),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        tracing::debug!("Looking up zones named {}", name);

        let request = self.client.get(self.url("/zones")).query(&[("name", name)]);
        self.send(request).await
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// ```
    async fn list_address_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
        fqdn: &str,
    ) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Looking up {} records named {}", record_type, fqdn);

        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[("type", record_type.as_str()), ("name", fqdn)]);
        self.send(request).await
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "home", "content": "1.2.3.4", "ttl": 120, "proxied": false }
    /// ```
    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<DnsRecord> {
        let url = self.url(&format!("/zones/{}/dns_records", zone_id));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(payload).unwrap_or_default()
            );
            return Ok(synthesized(format!("dry-run-{}", payload.name), payload));
        }

        self.send(self.client.post(url).json(payload)).await
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "home", "content": "1.2.3.4", "ttl": 120, "proxied": false }
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(payload).unwrap_or_default()
            );
            return Ok(synthesized(record_id.to_string(), payload));
        }

        self.send(self.client.put(url).json(payload)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// The record a write would have produced
fn synthesized(id: String, payload: &RecordPayload) -> DnsRecord {
    DnsRecord {
        id,
        record_type: payload.record_type,
        name: payload.name.clone(),
        content: payload.content.clone(),
        ttl: payload.ttl,
        proxied: payload.proxied,
    }
}
