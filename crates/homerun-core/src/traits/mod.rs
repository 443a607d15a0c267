//! Core traits for homerun
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Discover the host's public IP address
//! - [`DnsProvider`]: List, create and update records via a provider API

pub mod ip_resolver;
pub mod dns_provider;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord, RecordPayload, RecordType, Zone};
