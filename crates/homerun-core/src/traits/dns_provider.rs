// # DNS Provider Trait
//
// Defines the interface homerun needs from a DNS provider's API.
//
// ## Implementations
//
// - Cloudflare: `homerun-provider-cloudflare` crate
//
// ## Naming
//
// Lookups take the fully-qualified record name (`home.example.com`), writes
// take the name relative to the zone (`home`). Both are passed explicitly;
// callers never derive one from the other. See [`RecordSpec`](crate::RecordSpec).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider-side zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone ID (provider-specific)
    pub id: String,
    /// Zone name, e.g. `example.com`
    pub name: String,
}

/// DNS record type
///
/// Only address records are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-side DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the address)
    pub content: String,
    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: u32,
    /// Whether the provider proxies traffic for this record
    #[serde(default)]
    pub proxied: bool,
}

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record name relative to the zone
    pub name: String,
    /// Record content (the address)
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Whether the provider should proxy traffic for this record
    pub proxied: bool,
}

/// Trait for DNS provider clients
///
/// Implementations wrap one provider API. They are stateless and single-shot:
/// one method call is one API request.
///
/// # Forbidden
///
/// - Retry logic or backoff (the scheduler retries on its next tick)
/// - Deciding whether an update is needed (owned by the `Reconciler`)
/// - Caching zones or records between calls (the provider is the source of truth)
/// - Deleting anything
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List zones whose name is exactly `name`
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>, crate::Error>;

    /// List records of `record_type` named `fqdn` in a zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone to search
    /// - `record_type`: Record type filter
    /// - `fqdn`: Fully-qualified record name
    async fn list_address_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
        fqdn: &str,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record in a zone
    async fn create_record(
        &self,
        zone_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord, crate::Error>;

    /// Overwrite an existing record
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
