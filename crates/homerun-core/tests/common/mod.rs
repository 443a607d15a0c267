//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! provider operations a cycle performed.

#![allow(dead_code)]

use homerun_core::HomerunConfig;
use homerun_core::error::{Error, Result};
use homerun_core::scheduler::SchedulerEvent;
use homerun_core::traits::{DnsProvider, DnsRecord, IpResolver, RecordPayload, RecordType, Zone};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Address the scenarios resolve to
pub const RESOLVED_IP: &str = "203.0.113.7";

/// A stale address already on the provider
pub const STALE_IP: &str = "203.0.113.1";

/// The configuration used across scenarios
pub fn scenario_config() -> HomerunConfig {
    HomerunConfig {
        ip_server: "http://x/ip".to_string(),
        subdomain: "home".to_string(),
        domain: "example.com".to_string(),
        proxy: false,
        update_every: 5,
    }
}

/// An IP resolver whose answer the test controls
///
/// Clones share state, so a test can keep one handle and give the other
/// to the scheduler.
#[derive(Clone, Default)]
pub struct StubResolver {
    answer: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl StubResolver {
    /// Resolver that answers `ip`
    pub fn answering(ip: &str) -> Self {
        let resolver = Self::default();
        resolver.set_answer(Some(ip));
        resolver
    }

    /// Resolver that fails like an endpoint returning HTTP 500
    pub fn failing() -> Self {
        Self::default()
    }

    /// Change the answer; `None` makes the resolver fail
    pub fn set_answer(&self, ip: Option<&str>) {
        *self.answer.lock().unwrap() = ip.map(str::to_string);
    }

    /// Number of resolve() calls
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for StubResolver {
    async fn resolve(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::ip_unavailable("HTTP 500 Internal Server Error"))
    }

    fn endpoint(&self) -> &str {
        "http://x/ip"
    }
}

/// A resolver that takes `delay` of (virtual) time before answering
///
/// Real cycles spend time on the network; this makes the scheduler's
/// timing visible under a paused clock.
#[derive(Clone)]
pub struct SlowResolver {
    inner: StubResolver,
    delay: Duration,
}

impl SlowResolver {
    pub fn new(inner: StubResolver, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait::async_trait]
impl IpResolver for SlowResolver {
    async fn resolve(&self) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve().await
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

/// A provider call as observed by [`MockProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ListZones(String),
    ListRecords { zone_id: String, fqdn: String },
    Create { zone_id: String, payload: RecordPayload },
    Update { zone_id: String, record_id: String, payload: RecordPayload },
}

impl ProviderCall {
    pub fn is_write(&self) -> bool {
        matches!(self, ProviderCall::Create { .. } | ProviderCall::Update { .. })
    }
}

type FailureFn = Box<dyn Fn() -> Error + Send + Sync>;

/// An in-memory provider that tracks calls
///
/// Records live in a single list; each carries the fully-qualified name the
/// provider would report, derived from the zone it was created in.
#[derive(Default)]
pub struct MockProvider {
    zones: Mutex<Vec<Zone>>,
    records: Mutex<Vec<DnsRecord>>,
    calls: Mutex<Vec<ProviderCall>>,
    failure: Mutex<Option<FailureFn>>,
    latency: Duration,
    next_id: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone
    pub fn with_zone(self, name: &str) -> Self {
        let id = format!("zone-{}", self.zones.lock().unwrap().len() + 1);
        self.zones.lock().unwrap().push(Zone {
            id,
            name: name.to_string(),
        });
        self
    }

    /// Add an A record
    pub fn with_record(self, fqdn: &str, content: &str) -> Self {
        let id = self.allocate_id();
        self.records.lock().unwrap().push(DnsRecord {
            id,
            record_type: RecordType::A,
            name: fqdn.to_string(),
            content: content.to_string(),
            ttl: 120,
            proxied: false,
        });
        self
    }

    /// Spend `latency` of (virtual) time in every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every call fail with the error `make` builds
    pub fn fail_with(&self, make: impl Fn() -> Error + Send + Sync + 'static) {
        *self.failure.lock().unwrap() = Some(Box::new(make));
    }

    /// Stop failing
    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls of any kind
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of create/update calls
    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|call| call.is_write()).count()
    }

    /// Current records
    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    fn allocate_id(&self) -> String {
        format!("record-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn record_call(&self, call: ProviderCall) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().as_ref() {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    fn zone_name(&self, zone_id: &str) -> String {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .find(|zone| zone.id == zone_id)
            .map(|zone| zone.name.clone())
            .unwrap_or_default()
    }

    fn fqdn(&self, zone_id: &str, label: &str) -> String {
        let zone = self.zone_name(zone_id);
        if label == "@" { zone } else { format!("{label}.{zone}") }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockProvider {
    async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        self.record_call(ProviderCall::ListZones(name.to_string())).await?;
        Ok(self
            .zones
            .lock()
            .unwrap()
            .iter()
            .filter(|zone| zone.name == name)
            .cloned()
            .collect())
    }

    async fn list_address_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
        fqdn: &str,
    ) -> Result<Vec<DnsRecord>> {
        self.record_call(ProviderCall::ListRecords {
            zone_id: zone_id.to_string(),
            fqdn: fqdn.to_string(),
        })
        .await?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.record_type == record_type && record.name == fqdn)
            .cloned()
            .collect())
    }

    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<DnsRecord> {
        self.record_call(ProviderCall::Create {
            zone_id: zone_id.to_string(),
            payload: payload.clone(),
        })
        .await?;

        let record = DnsRecord {
            id: self.allocate_id(),
            record_type: payload.record_type,
            name: self.fqdn(zone_id, &payload.name),
            content: payload.content.clone(),
            ttl: payload.ttl,
            proxied: payload.proxied,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord> {
        self.record_call(ProviderCall::Update {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            payload: payload.clone(),
        })
        .await?;

        let name = self.fqdn(zone_id, &payload.name);
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| Error::provider("mock", Some(404), "Record not found"))?;

        record.name = name;
        record.content = payload.content.clone();
        record.ttl = payload.ttl;
        record.proxied = payload.proxied;
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Drain every event currently queued
pub fn drain_events(rx: &mut mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count successful cycles among `events`
pub fn successful_cycles(events: &[SchedulerEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SchedulerEvent::CycleSucceeded(_)))
        .count()
}

/// Count failed cycles among `events`
pub fn failed_cycles(events: &[SchedulerEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SchedulerEvent::CycleFailed { .. }))
        .count()
}
