//! Enrichment job records tracked by the orchestrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::{Mode, Tier};

/// Status reported by the batch enrichment service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Error,
    /// Anything else the service reports (queued, pending, ...)
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Completed and errored jobs will not transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of one batch job as returned by the status API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub enriched: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_fields_updated: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusReport {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            enriched: 0,
            total: 0,
            total_fields_updated: 0,
            errors: 0,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Local record of one launched batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub tier: Tier,
    pub mode: Mode,
    pub entity_count: usize,
    pub started_at: DateTime<Utc>,
    pub estimated_cost: f64,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>, tier: Tier, mode: Mode, entity_count: usize) -> Self {
        Self {
            job_id: job_id.into(),
            tier,
            mode,
            entity_count,
            started_at: Utc::now(),
            estimated_cost: mode.estimate_cost(entity_count),
        }
    }
}

/// Deferred "launch `tier` in `mode` once `after_job_id` finishes"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub after_job_id: String,
    pub tier: Tier,
    pub mode: Mode,
    pub registered_at: DateTime<Utc>,
}

impl ChainEntry {
    pub fn new(after_job_id: impl Into<String>, tier: Tier, mode: Mode) -> Self {
        Self {
            after_job_id: after_job_id.into(),
            tier,
            mode,
            registered_at: Utc::now(),
        }
    }
}

/// Outcome of the most recent finished run for a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStat {
    pub tier: Tier,
    pub job_id: String,
    pub mode: Mode,
    pub status: JobStatus,
    pub enriched: u64,
    pub total: u64,
    pub fields_updated: u64,
    pub errors: u64,
    pub cost: f64,
    pub duration_secs: i64,
    pub completed_at: DateTime<Utc>,
}

impl RunStat {
    /// Build from a handle and its terminal status report.
    ///
    /// `observed_at` stands in for `completed_at` when the service omits it.
    pub fn from_terminal(handle: &JobHandle, report: &JobStatusReport, observed_at: DateTime<Utc>) -> Self {
        let completed_at = report.completed_at.unwrap_or(observed_at);
        let duration_secs = (completed_at - handle.started_at).num_seconds().max(0);

        Self {
            tier: handle.tier,
            job_id: handle.job_id.clone(),
            mode: handle.mode,
            status: report.status,
            enriched: report.enriched,
            total: report.total,
            fields_updated: report.total_fields_updated,
            errors: report.errors,
            cost: handle.estimated_cost,
            duration_secs,
            completed_at,
        }
    }

    /// True when the batch reported an error status or per-entity failures
    pub fn had_failures(&self) -> bool {
        self.status == JobStatus::Error || self.errors > 0
    }
}
