//! Calendar-aware trigger set
//!
//! Each trigger is a `(schedule, calendar_gated, action)` rule. The ticker
//! picks up due rules and hands them to the orchestrator, which applies the
//! calendar gate and the per-tier cadence guards.

mod config;
mod rule;
mod runner;

pub use config::{TriggerTime, TriggersConfig};
pub use rule::{Schedule, TriggerAction, TriggerRule};
pub use runner::{TriggerSet, run_monitor, run_triggers};
