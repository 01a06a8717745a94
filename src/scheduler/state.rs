//! In-memory scheduler state
//!
//! Everything here is memory-resident only. A process restart starts from
//! an empty state; batches launched before the restart keep running in the
//! backend but are no longer tracked or chained from.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{JobHandle, RankingSnapshot, RunStat, Tier};

use super::error::ScanError;
use super::queue::ChainQueue;

/// Registry, chain queue, run stats and counters for one orchestrator
#[derive(Debug, Default)]
pub struct SchedulerState {
    jobs: HashMap<String, JobHandle>,
    pub(crate) chains: ChainQueue,
    pub(crate) run_stats: BTreeMap<Tier, RunStat>,
    pub(crate) total_scans_launched: u64,
    pub(crate) total_estimated_cost: f64,
    pub(crate) biweekly_toggle: bool,
    pub(crate) last_ranking: Option<RankingSnapshot>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a launched job; a job id can be registered only once
    pub fn register(&mut self, handle: JobHandle) -> Result<(), ScanError> {
        if self.jobs.contains_key(&handle.job_id) {
            return Err(ScanError::DuplicateJob(handle.job_id));
        }
        self.jobs.insert(handle.job_id.clone(), handle);
        self.total_scans_launched += 1;
        Ok(())
    }

    /// Stop tracking a job. Returns None when it was already removed.
    pub fn remove(&mut self, job_id: &str) -> Option<JobHandle> {
        self.jobs.remove(job_id)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn active_jobs(&self) -> impl Iterator<Item = &JobHandle> {
        self.jobs.values()
    }

    pub fn chains(&self) -> &ChainQueue {
        &self.chains
    }

    pub fn total_scans_launched(&self) -> u64 {
        self.total_scans_launched
    }

    pub fn total_estimated_cost(&self) -> f64 {
        self.total_estimated_cost
    }

    pub fn biweekly_toggle(&self) -> bool {
        self.biweekly_toggle
    }

    pub fn last_ranking(&self) -> Option<&RankingSnapshot> {
        self.last_ranking.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mode;

    #[test]
    fn test_register_rejects_duplicate_ids() {
        let mut state = SchedulerState::new();
        state.register(JobHandle::new("job-1", Tier::Hot, Mode::Full, 5)).unwrap();

        let err = state
            .register(JobHandle::new("job-1", Tier::Active, Mode::Standard, 9))
            .unwrap_err();
        assert!(matches!(err, ScanError::DuplicateJob(ref id) if id == "job-1"));
        assert_eq!(state.active_jobs().count(), 1);
        assert_eq!(state.active_jobs().next().unwrap().tier, Tier::Hot);
        assert_eq!(state.total_scans_launched(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut state = SchedulerState::new();
        state.register(JobHandle::new("job-1", Tier::Hot, Mode::Full, 5)).unwrap();

        assert!(state.remove("job-1").is_some());
        assert!(state.remove("job-1").is_none());
        assert!(!state.contains("job-1"));
    }
}
