// # homerun-core
//
// Core library for homerun, a dynamic DNS updater that keeps one A record
// pointed at the host's public IP.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for listing, creating and updating records via a provider API
// - **Reconciler**: Makes the provider's record match the resolved IP, writing only on divergence
// - **Scheduler**: Runs a reconciliation cycle at startup, then on a fixed period
//
// ## Design Principles
//
// 1. **Provider as source of truth**: Nothing is cached between cycles
// 2. **Idempotency**: A record that already matches is never written
// 3. **Explicit dependencies**: Resolver and provider are injected, never global
// 4. **Library-First**: The daemon is a thin wrapper over this crate

pub mod traits;
pub mod reconciler;
pub mod scheduler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpResolver, DnsProvider};
pub use reconciler::{Outcome, Reconciler, RecordSpec};
pub use scheduler::{CycleReport, Scheduler, SchedulerEvent};
pub use config::HomerunConfig;
pub use error::{Error, Result};
