//! Observability snapshot of the orchestrator

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ChainEntry, JobHandle, RankingSnapshot, RunStat, Tier};

/// A registered job plus how long it has been going
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJob {
    #[serde(flatten)]
    pub handle: JobHandle,
    pub running_secs: i64,
    /// Rough wall-clock expectation from the mode's per-entity time
    pub expected_secs: u64,
}

impl ActiveJob {
    pub fn new(handle: JobHandle, now: DateTime<Utc>) -> Self {
        let running_secs = (now - handle.started_at).num_seconds().max(0);
        let expected_secs = handle.mode.estimate_duration(handle.entity_count).as_secs();
        Self {
            handle,
            running_secs,
            expected_secs,
        }
    }
}

/// Everything an operator needs to see: calendar verdict, in-flight jobs,
/// pending chains, last run per tier and the running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub generated_at: DateTime<Utc>,
    pub local_date: NaiveDate,
    pub today_allowed: bool,
    pub skip_reason: Option<String>,
    pub active_job_count: usize,
    pub active_jobs: Vec<ActiveJob>,
    pub chain_queue: Vec<ChainEntry>,
    pub last_runs: BTreeMap<Tier, RunStat>,
    pub total_scans_launched: u64,
    pub total_estimated_cost: f64,
    pub biweekly_toggle: bool,
    pub last_ranking: Option<RankingSnapshot>,
}

impl SchedulerStatus {
    /// Write as pretty JSON via a temp file, so readers never see a torn file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize status")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).context(format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path).context(format!("Failed to move status into {}", path.display()))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!("Failed to read status file {}", path.display()))?;
        serde_json::from_str(&content).context(format!("Failed to parse status file {}", path.display()))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Status at {} (local date {})", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"), self.local_date);
        match (self.today_allowed, &self.skip_reason) {
            (true, _) => {
                let _ = writeln!(out, "Today: scans allowed");
            }
            (false, Some(reason)) => {
                let _ = writeln!(out, "Today: skipped ({})", reason);
            }
            (false, None) => {
                let _ = writeln!(out, "Today: skipped");
            }
        }

        let _ = writeln!(out, "\nActive jobs: {}", self.active_job_count);
        for job in &self.active_jobs {
            let _ = writeln!(
                out,
                "  {:<12} {:<8} {:<9} {:>5} entities  {:>5}m / ~{}m  ${:.2}",
                job.handle.job_id,
                job.handle.tier,
                job.handle.mode,
                job.handle.entity_count,
                job.running_secs / 60,
                job.expected_secs / 60,
                job.handle.estimated_cost
            );
        }

        if !self.chain_queue.is_empty() {
            let _ = writeln!(out, "\nChained launches: {}", self.chain_queue.len());
            for entry in &self.chain_queue {
                let _ = writeln!(out, "  after {:<12} -> {} ({})", entry.after_job_id, entry.tier, entry.mode);
            }
        }

        let _ = writeln!(out, "\nLast runs:");
        if self.last_runs.is_empty() {
            let _ = writeln!(out, "  none yet");
        }
        for stat in self.last_runs.values() {
            let _ = writeln!(
                out,
                "  {:<8} {:<12} {:<9} {}/{} enriched, {} errors, {} fields, {}m, ${:.2}",
                stat.tier,
                stat.job_id,
                stat.status,
                stat.enriched,
                stat.total,
                stat.errors,
                stat.fields_updated,
                stat.duration_secs / 60,
                stat.cost
            );
        }

        if let Some(ranking) = &self.last_ranking {
            let _ = writeln!(
                out,
                "\nLast ranking ({}): hot={} active={} dormant={}",
                ranking.taken_at.format("%Y-%m-%d %H:%M"),
                ranking.hot,
                ranking.active,
                ranking.dormant
            );
        }

        let _ = writeln!(
            out,
            "\nScans launched: {}  Estimated spend: ${:.2}  Bi-weekly toggle: {}",
            self.total_scans_launched,
            self.total_estimated_cost,
            if self.biweekly_toggle { "on" } else { "off" }
        );
        out
    }
}
