//! Record reconciliation
//!
//! The Reconciler makes the provider's A record match a freshly resolved IP:
//! - Finds the single zone named after the configured domain
//! - Looks up the record by its fully-qualified name
//! - Creates it, updates it, or leaves it alone
//!
//! ## Flow
//!
//! ```text
//!   list_zones(domain) ── count != 1 ──▶ Error::ZoneLookup
//!          │
//!          ▼
//!   list_address_records(zone, A, fqdn)
//!          │
//!    ┌─────┴──────────────┬──────────────────────────┐
//!    │ none               │ first.content == ip      │ first.content != ip
//!    ▼                    ▼                          ▼
//! create_record      Outcome::Unchanged        update_record
//! Outcome::Created   (no write)                Outcome::Updated
//! ```
//!
//! At most one write per cycle. Nothing is ever deleted. Provider failures
//! propagate untouched; there is no retry here.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsRecord, RecordPayload, RecordType};

/// TTL, in seconds, written on every create and update
pub const RECORD_TTL: u32 = 120;

/// Label designating the zone apex
const APEX: &str = "@";

/// The address record homerun maintains
///
/// The provider looks records up by fully-qualified name but writes them by
/// name relative to the zone. Both forms are computed once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    label: String,
    domain: String,
    fqdn: String,
    proxied: bool,
}

impl RecordSpec {
    /// Describe the record `subdomain`.`domain`
    ///
    /// `subdomain = "@"` targets the zone apex.
    pub fn new(subdomain: impl Into<String>, domain: impl Into<String>, proxied: bool) -> Self {
        let label = subdomain.into();
        let domain = domain.into();
        let fqdn = if label == APEX {
            domain.clone()
        } else {
            format!("{label}.{domain}")
        };

        Self {
            label,
            domain,
            fqdn,
            proxied,
        }
    }

    /// Name used in writes, relative to the zone
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Zone name
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Name used in lookups
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Whether the record should be proxied
    pub fn proxied(&self) -> bool {
        self.proxied
    }

    /// Write payload pointing this record at `ip`
    pub fn payload(&self, ip: &str) -> RecordPayload {
        RecordPayload {
            record_type: RecordType::A,
            name: self.label.clone(),
            content: ip.to_string(),
            ttl: RECORD_TTL,
            proxied: self.proxied,
        }
    }
}

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No record existed; one was created
    Created {
        /// The record as returned by the provider
        record: DnsRecord,
    },

    /// The record pointed elsewhere and was overwritten
    Updated {
        /// The record as returned by the provider
        record: DnsRecord,
        /// Content before the update
        previous_content: String,
    },

    /// The record already pointed at the resolved IP
    Unchanged {
        /// The record as found
        record: DnsRecord,
    },
}

impl Outcome {
    /// The record after reconciliation
    pub fn record(&self) -> &DnsRecord {
        match self {
            Outcome::Created { record }
            | Outcome::Updated { record, .. }
            | Outcome::Unchanged { record } => record,
        }
    }

    /// Whether a write call was made
    pub fn wrote(&self) -> bool {
        !matches!(self, Outcome::Unchanged { .. })
    }
}

/// Ensures one address record carries the desired content
///
/// The provider is injected at construction so tests can substitute a double.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
}

impl Reconciler {
    /// Create a reconciler over `provider`
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Point `record` at `ip`
    ///
    /// # Returns
    ///
    /// - `Ok(Outcome)`: What was done
    /// - `Err(Error::ZoneLookup)`: Zero or several zones matched; nothing written
    /// - `Err(_)`: Provider failure, propagated as-is
    pub async fn reconcile(&self, record: &RecordSpec, ip: &str) -> Result<Outcome> {
        let zones = self.provider.list_zones(record.domain()).await?;
        if zones.len() != 1 {
            return Err(Error::ZoneLookup {
                domain: record.domain().to_string(),
                matches: zones.len(),
            });
        }
        let zone = &zones[0];
        debug!("Using zone {} ({})", zone.name, zone.id);

        let mut existing = self
            .provider
            .list_address_records(&zone.id, RecordType::A, record.fqdn())
            .await?;

        if existing.len() > 1 {
            warn!(
                "{} A records named {} in zone {}, using the first one",
                existing.len(),
                record.fqdn(),
                zone.name
            );
        }

        let payload = record.payload(ip);

        if existing.is_empty() {
            let created = self.provider.create_record(&zone.id, &payload).await?;
            info!("Created A record {} -> {}", record.fqdn(), ip);
            return Ok(Outcome::Created { record: created });
        }

        let current = existing.swap_remove(0);
        if current.content == ip {
            debug!("A record {} already points at {}", record.fqdn(), ip);
            return Ok(Outcome::Unchanged { record: current });
        }

        let updated = self
            .provider
            .update_record(&zone.id, &current.id, &payload)
            .await?;
        info!(
            "Updated A record {} -> {} (was: {})",
            record.fqdn(),
            ip,
            current.content
        );

        Ok(Outcome::Updated {
            record: updated,
            previous_content: current.content,
        })
    }
}
