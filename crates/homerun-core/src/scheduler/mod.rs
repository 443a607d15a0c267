//! Scheduler loop
//!
//! The Scheduler drives reconciliation cycles:
//! - One cycle immediately at startup
//! - Then one cycle every `update_every` minutes, checked on a fixed poll tick
//! - Failures are logged and retried on the next due tick
//!
//! ## Timeline
//!
//! ```text
//!  t=0        first cycle (a zone configuration error here aborts the run)
//!  t=0,60s..  poll tick: run the job if due, otherwise idle
//!  t=N min    job due → cycle → next run at that tick + N min
//! ```
//!
//! ## Shutdown
//!
//! The loop runs until the shutdown future completes. An in-flight cycle is
//! abandoned; each cycle is a handful of bounded HTTP calls and the provider
//! applies each write atomically.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::config::HomerunConfig;
use crate::error::{Error, Result};
use crate::reconciler::{Outcome, Reconciler, RecordSpec};
use crate::traits::{DnsProvider, IpResolver};

/// How often the loop wakes to check whether the job is due
///
/// The finest configurable period is one minute, so a one-minute tick never
/// misses a due job.
pub const DEFAULT_POLL_TICK: Duration = Duration::from_secs(60);

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Address the resolver returned
    pub ip: String,
    /// What the reconciler did
    pub outcome: Outcome,
    /// Wall-clock completion time
    pub finished_at: DateTime<Utc>,
}

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Loop started
    Started {
        /// Reconciliation period
        every: Duration,
    },

    /// A cycle completed
    CycleSucceeded(CycleReport),

    /// A cycle failed
    CycleFailed {
        /// Error description
        error: String,
        /// Whether the failure is a configuration problem
        configuration: bool,
    },

    /// Loop stopped
    Stopped {
        /// Why
        reason: String,
    },
}

/// A recurring job measured on the monotonic clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    every: Duration,
    next_run: Instant,
}

impl Job {
    /// A job first due one period after `now`
    pub fn new(every: Duration, now: Instant) -> Self {
        Self {
            every,
            next_run: now + every,
        }
    }

    /// Whether the job should run at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_run
    }

    /// Record a run started by the tick scheduled at `tick`
    ///
    /// The next run is one period after the tick, not after the cycle
    /// finished, so cycle duration never pushes the job past a due tick.
    pub fn mark_ran(&mut self, tick: Instant) {
        self.next_run = tick + self.every;
    }

    /// When the job is next due
    pub fn next_run(&self) -> Instant {
        self.next_run
    }
}

/// Periodic reconciliation loop
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Run with [`Scheduler::run_until()`] (or [`Scheduler::run_with_shutdown()`])
/// 3. The loop runs until the shutdown future completes
///
/// Single task: cycles never overlap.
pub struct Scheduler {
    /// Public IP resolver
    resolver: Box<dyn IpResolver>,

    /// Record reconciler
    reconciler: Reconciler,

    /// The record to maintain
    record: RecordSpec,

    /// Reconciliation period
    every: Duration,

    /// Wake-up granularity
    poll_tick: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `resolver`: Public IP resolver
    /// - `provider`: DNS provider client
    /// - `config`: homerun configuration
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver). Dropping the receiver is fine;
    /// events are then discarded.
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Arc<dyn DnsProvider>,
        config: &HomerunConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let scheduler = Self {
            resolver,
            reconciler: Reconciler::new(provider),
            record: config.record(),
            every: config.update_interval(),
            poll_tick: DEFAULT_POLL_TICK,
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    /// Override the poll tick
    ///
    /// A zero tick is raised to one millisecond.
    pub fn with_poll_tick(mut self, poll_tick: Duration) -> Self {
        self.poll_tick = poll_tick.max(Duration::from_millis(1));
        self
    }

    /// The record being maintained
    pub fn record(&self) -> &RecordSpec {
        &self.record
    }

    /// Reconciliation period
    pub fn every(&self) -> Duration {
        self.every
    }

    /// Run one reconciliation cycle
    ///
    /// A resolver failure returns before any provider call is made.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let ip = self.resolver.resolve().await?;
        debug!("Resolved public IP {} via {}", ip, self.resolver.endpoint());

        let outcome = self.reconciler.reconcile(&self.record, &ip).await?;

        Ok(CycleReport {
            ip,
            outcome,
            finished_at: Utc::now(),
        })
    }

    /// Run the loop until `shutdown` completes
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Shutdown requested
    /// - `Err(Error)`: The first cycle hit a configuration error
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!(
            "Keeping {} up to date via {} every {}s",
            self.record.fqdn(),
            self.reconciler.provider_name(),
            self.every.as_secs()
        );
        self.emit_event(SchedulerEvent::Started { every: self.every });

        let result = tokio::select! {
            result = self.drive() => result,
            () = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        let reason = match &result {
            Ok(()) => "Shutdown signal".to_string(),
            Err(e) => e.to_string(),
        };
        self.emit_event(SchedulerEvent::Stopped { reason });

        result
    }

    /// Run the loop until `shutdown_rx` fires or its sender is dropped
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// The loop proper; returns only on a fatal startup error
    async fn drive(&self) -> Result<()> {
        // Correct state immediately rather than after a full period
        match self.run_cycle().await {
            Err(e) if e.is_configuration() => {
                error!("Startup cycle failed, giving up: {}", e);
                self.emit_event(SchedulerEvent::CycleFailed {
                    error: e.to_string(),
                    configuration: true,
                });
                return Err(e);
            }
            result => self.report(result),
        }

        // Job and ticks share one anchor so due times land exactly on ticks
        let start = Instant::now();
        let mut job = Job::new(self.every, start);

        let mut interval = tokio::time::interval_at(start, self.poll_tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        while let Some(tick) = ticks.next().await {
            if !job.is_due(tick) {
                continue;
            }

            let result = self.run_cycle().await;
            job.mark_ran(tick);
            self.report(result);
        }

        Ok(())
    }

    /// Log a cycle result and emit the matching event
    fn report(&self, result: Result<CycleReport>) {
        match result {
            Ok(report) => {
                if !report.outcome.wrote() {
                    debug!("No change needed for {}", self.record.fqdn());
                }
                self.emit_event(SchedulerEvent::CycleSucceeded(report));
            }
            Err(e) => {
                match &e {
                    Error::IpUnavailable(_) => {
                        warn!("{}, no DNS records were modified", e);
                    }
                    _ if e.is_configuration() => {
                        error!("{} (will retry on the next run)", e);
                    }
                    _ => {
                        error!("API error: {}", e);
                    }
                }

                if let Some(hint) = e.hint() {
                    error!("{}", hint);
                }

                self.emit_event(SchedulerEvent::CycleFailed {
                    error: e.to_string(),
                    configuration: e.is_configuration(),
                });
            }
        }
    }

    /// Emit a scheduler event without blocking
    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
