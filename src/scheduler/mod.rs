//! Tiered scan orchestrator
//!
//! Launches enrichment batches per tier, tracks them until they reach a
//! terminal status and fires chained launches once their anchor finishes.

mod config;
mod core;
mod error;
mod queue;
mod state;
mod status;

pub use config::{SchedulerConfig, default_status_file};
pub use core::{FinishedJob, LaunchOutcome, MonitorReport, Orchestrator, TriggerOutcome};
pub use error::ScanError;
pub use queue::ChainQueue;
pub use state::SchedulerState;
pub use status::{ActiveJob, SchedulerStatus};
