//! Tierscan - calendar-aware tiered enrichment scan orchestrator
//!
//! Tierscan decides when to spend enrichment budget on which residential
//! complexes. A priority classifier splits the population into HOT, ACTIVE
//! and DORMANT tiers; each tier is scanned on its own cadence and depth, on
//! permitted business days only.
//!
//! # Core Concepts
//!
//! - **Fire and forget**: launching a batch returns as soon as the backend
//!   accepts it; a monitor polls in-flight jobs on its own interval
//! - **Chained launches**: a launch can wait on another job and fires exactly
//!   once when that job reaches a terminal status
//! - **Calendar gate**: rest days, holidays and operator skip dates block
//!   tier scans; daily maintenance still runs
//!
//! # Modules
//!
//! - [`backend`] - Collaborator traits and the HTTP implementation
//! - [`calendar`] - Business-day gate and date predicates
//! - [`domain`] - Tiers, modes, job handles and ranking reports
//! - [`scheduler`] - The orchestrator and its state
//! - [`triggers`] - Recurring trigger rules and the ticker loops
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod backend;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod domain;
pub mod scheduler;
pub mod triggers;

// Re-export commonly used types
pub use backend::{
    BackendError, BatchLauncher, Collaborators, HttpBackend, JobStatusSource, ListingRefresher, PriorityClassifier,
    Recalculator,
};
pub use calendar::{CalendarGate, OperativeZone, SkipDecision};
pub use config::{BackendConfig, CalendarConfig, Config};
pub use domain::{
    ChainEntry, JobHandle, JobStatus, JobStatusReport, Mode, PriorityReport, RankedComplex, RankingSnapshot, RunStat,
    Tier,
};
pub use scheduler::{
    FinishedJob, LaunchOutcome, MonitorReport, Orchestrator, ScanError, SchedulerConfig, SchedulerStatus,
    TriggerOutcome,
};
pub use triggers::{Schedule, TriggerAction, TriggerRule, TriggerSet, TriggersConfig};
