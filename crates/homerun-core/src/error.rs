//! Error types for homerun
//!
//! This module defines all error types used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for homerun operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hint shown alongside authentication failures
const CREDENTIALS_HINT: &str = "Did you configure your Cloudflare credentials properly? \
     Set CLOUDFLARE_API_TOKEN, or CF_API_KEY together with CF_API_EMAIL.";

/// Core error type for homerun
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be read
    #[error("Could not read config file '{}': {source}", path.display())]
    ConfigRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or a key has the wrong type
    #[error("Could not parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A required configuration key is absent
    #[error("Missing `{0}` parameter in config file")]
    MissingConfigKey(&'static str),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The public IP endpoint did not produce an address
    #[error("Could not retrieve IP: {0}")]
    IpUnavailable(String),

    /// Zero or several zones matched the configured domain
    #[error("Expected exactly one zone named '{domain}', found {matches}")]
    ZoneLookup {
        /// Configured domain
        domain: String,
        /// Number of zones the provider returned
        matches: usize,
    },

    /// The provider rejected our credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider is throttling us
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other provider API failure
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// HTTP status, when the failure came with one
        status: Option<u16>,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IP resolution error
    pub fn ip_unavailable(msg: impl Into<String>) -> Self {
        Self::IpUnavailable(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether this error stems from configuration rather than a transient condition
    ///
    /// Zone lookup failures count as configuration: the domain in the config
    /// file does not name exactly one zone on the account.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead { .. }
                | Self::ConfigParse(_)
                | Self::MissingConfigKey(_)
                | Self::Config(_)
                | Self::ZoneLookup { .. }
        )
    }

    /// Whether the provider refused our credentials
    ///
    /// Besides the dedicated variant, provider messages mentioning the
    /// `X-Auth` headers are treated as authentication problems.
    pub fn is_authentication(&self) -> bool {
        match self {
            Self::Authentication(_) => true,
            Self::Provider { message, .. } => message.contains("X-Auth"),
            _ => false,
        }
    }

    /// User-facing hint for errors the operator can fix
    pub fn hint(&self) -> Option<&'static str> {
        self.is_authentication().then_some(CREDENTIALS_HINT)
    }
}
