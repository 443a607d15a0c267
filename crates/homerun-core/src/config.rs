//! Configuration types for homerun
//!
//! The configuration is a flat TOML document read once at startup:
//!
//! ```toml
//! ip_server = "https://api.ipify.org"
//! subdomain = "home"
//! domain = "example.com"
//! proxy = false
//! update_every = 5
//! ```
//!
//! Every key is required. A missing key is reported by name.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::reconciler::RecordSpec;

/// Keys every configuration must carry, in the order they are checked
pub const REQUIRED_KEYS: [&str; 5] = ["ip_server", "subdomain", "domain", "proxy", "update_every"];

/// Main homerun configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomerunConfig {
    /// URL that answers a GET with the caller's public IP as the whole body
    pub ip_server: String,

    /// Name of the A record, relative to `domain` (`@` for the zone apex)
    pub subdomain: String,

    /// Zone the record lives in
    pub domain: String,

    /// Route traffic through the provider's edge network
    pub proxy: bool,

    /// Reconciliation period in minutes
    pub update_every: u64,
}

/// On-disk shape, with every key optional so absence can be reported by name
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    ip_server: Option<String>,
    subdomain: Option<String>,
    domain: Option<String>,
    proxy: Option<bool>,
    update_every: Option<u64>,
}

impl HomerunConfig {
    /// Load and validate the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Loaded config file {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let config = Self {
            ip_server: raw.ip_server.ok_or(Error::MissingConfigKey(REQUIRED_KEYS[0]))?,
            subdomain: raw.subdomain.ok_or(Error::MissingConfigKey(REQUIRED_KEYS[1]))?,
            domain: raw.domain.ok_or(Error::MissingConfigKey(REQUIRED_KEYS[2]))?,
            proxy: raw.proxy.ok_or(Error::MissingConfigKey(REQUIRED_KEYS[3]))?,
            update_every: raw.update_every.ok_or(Error::MissingConfigKey(REQUIRED_KEYS[4]))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.ip_server.starts_with("http://") || self.ip_server.starts_with("https://")) {
            return Err(Error::config(format!(
                "ip_server must be an HTTP or HTTPS URL. Got: '{}'",
                self.ip_server
            )));
        }

        if self.subdomain.trim().is_empty() {
            return Err(Error::config("subdomain cannot be empty"));
        }

        if self.domain.trim().is_empty() {
            return Err(Error::config("domain cannot be empty"));
        }

        if self.update_every == 0 {
            return Err(Error::config("update_every must be at least 1 minute"));
        }

        Ok(())
    }

    /// Reconciliation period as a duration
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_every.saturating_mul(60))
    }

    /// The record this configuration asks us to maintain
    pub fn record(&self) -> RecordSpec {
        RecordSpec::new(&self.subdomain, &self.domain, self.proxy)
    }
}
