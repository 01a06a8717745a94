//! Orchestrator implementation

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, Collaborators};
use crate::calendar::{CalendarGate, OperativeZone, advance_biweekly, in_dormant_window, is_first_week_of_month};
use crate::domain::{ChainEntry, JobHandle, JobStatus, JobStatusReport, Mode, RankingSnapshot, RunStat, Tier};
use crate::triggers::{TriggerAction, TriggerRule};

use super::config::SchedulerConfig;
use super::error::ScanError;
use super::state::SchedulerState;
use super::status::{ActiveJob, SchedulerStatus};

/// Result of a launch request
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    /// Batch accepted and registered
    Launched(JobHandle),

    /// Classifier returned nobody for this tier; nothing was launched
    NoCandidates { tier: Tier },
}

/// A job the monitor saw reach a terminal status
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedJob {
    pub job_id: String,
    pub tier: Tier,
    pub status: JobStatus,
    /// Job launched from the chain queue in response, if any
    pub chained_job_id: Option<String>,
}

/// Summary of one monitor pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorReport {
    pub polled: usize,
    pub still_running: usize,
    pub poll_errors: usize,
    pub finished: Vec<FinishedJob>,
}

/// What a fired trigger ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    SkippedByCalendar { reason: String },
    /// Cadence guard (bi-weekly toggle or date window) said not this time
    OffCycle,
    Launched { job_id: String, tier: Tier, mode: Mode, chained: bool },
    NoCandidates { tier: Tier },
    Ranked(RankingSnapshot),
    Completed,
    Failed { error: String },
}

/// The tiered scan orchestrator.
///
/// Owns the scheduler state behind a single mutex that is never held across
/// a backend call. A launch classifies and starts the batch unlocked, then
/// registers the handle together with any chain bookkeeping it implies
/// (the monthly ACTIVE entry, or re-pointing a fired chain's anchor) in one
/// short critical section.
pub struct Orchestrator {
    config: SchedulerConfig,
    collaborators: Collaborators,
    gate: CalendarGate,
    zone: OperativeZone,
    state: Mutex<SchedulerState>,
}

impl Orchestrator {
    pub fn new(
        config: SchedulerConfig,
        collaborators: Collaborators,
        gate: CalendarGate,
        zone: impl Into<OperativeZone>,
    ) -> Self {
        let zone = zone.into();
        debug!(?config, %zone, "Orchestrator::new: called");
        Self {
            config,
            collaborators,
            gate,
            zone,
            state: Mutex::new(SchedulerState::new()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn gate(&self) -> &CalendarGate {
        &self.gate
    }

    pub fn zone(&self) -> OperativeZone {
        self.zone
    }

    /// Current time in the operative timezone
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.zone.now()
    }

    /// Run a backend call under the configured timeout
    async fn bounded<T, F>(&self, call: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let limit = self.config.call_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(limit)),
        }
    }

    /// Classify, pick the tier's candidates and start a batch.
    ///
    /// Returns as soon as the launcher accepts the job.
    pub async fn launch_tier_scan(&self, tier: Tier, mode_override: Option<Mode>) -> Result<LaunchOutcome, ScanError> {
        debug!(%tier, ?mode_override, "launch_tier_scan: called");
        let today = self.now_local().date_naive();
        self.launch_with(tier, mode_override, today, |_, _| {}).await
    }

    /// Classify and start a batch without touching scheduler state.
    ///
    /// Returns None when the tier has no candidates.
    async fn start_batch(
        &self,
        tier: Tier,
        mode_override: Option<Mode>,
        today: NaiveDate,
    ) -> Result<Option<JobHandle>, ScanError> {
        let report = self
            .bounded(self.collaborators.classifier.calculate_all_priorities())
            .await
            .map_err(ScanError::Classifier)?;

        let ids = report.candidate_ids(tier);
        let mode = mode_override.unwrap_or_else(|| tier.default_mode(is_first_week_of_month(today)));

        if ids.is_empty() {
            info!(%tier, %mode, "No candidates for tier, nothing launched");
            return Ok(None);
        }

        let job_id = self
            .bounded(self.collaborators.launcher.enrich_by_ids(&ids, mode))
            .await
            .map_err(|source| ScanError::Launch { tier, source })?;

        Ok(Some(JobHandle::new(job_id, tier, mode, ids.len())))
    }

    /// Start a batch, then register it and run `then` under one lock acquisition
    async fn launch_with<F>(
        &self,
        tier: Tier,
        mode_override: Option<Mode>,
        today: NaiveDate,
        then: F,
    ) -> Result<LaunchOutcome, ScanError>
    where
        F: FnOnce(&mut SchedulerState, &JobHandle),
    {
        let Some(handle) = self.start_batch(tier, mode_override, today).await? else {
            return Ok(LaunchOutcome::NoCandidates { tier });
        };

        {
            let mut state = self.state.lock().await;
            state.register(handle.clone())?;
            then(&mut *state, &handle);
        }

        info!(
            job_id = %handle.job_id,
            %tier,
            mode = %handle.mode,
            entities = handle.entity_count,
            estimated_cost = handle.estimated_cost,
            expected_mins = handle.mode.estimate_duration(handle.entity_count).as_secs() / 60,
            "Launched tier scan"
        );
        Ok(LaunchOutcome::Launched(handle))
    }

    /// Queue a launch of `tier` for when `after_job_id` finishes.
    ///
    /// The anchor is not validated; it may be a job the monitor has not
    /// observed yet. Returns the queue length.
    pub async fn chain_after(&self, after_job_id: &str, tier: Tier, mode: Mode) -> usize {
        let mut state = self.state.lock().await;
        let len = state.chains.push(ChainEntry::new(after_job_id, tier, mode));
        info!(after = %after_job_id, %tier, %mode, queue_len = len, "Chained launch registered");
        len
    }

    /// Poll every registered job once and finalize the terminal ones
    pub async fn monitor_jobs(&self) -> MonitorReport {
        let handles: Vec<JobHandle> = {
            let state = self.state.lock().await;
            state.active_jobs().cloned().collect()
        };

        let mut report = MonitorReport {
            polled: handles.len(),
            ..Default::default()
        };
        if handles.is_empty() {
            debug!("monitor_jobs: no active jobs");
            return report;
        }

        let polls = join_all(handles.iter().map(|handle| async move {
            let status = self.bounded(self.collaborators.status.get_job_status(&handle.job_id)).await;
            (handle, status)
        }))
        .await;

        for (handle, status) in polls {
            match status {
                Err(e) => {
                    warn!(job_id = %handle.job_id, tier = %handle.tier, error = %e, "Job status poll failed");
                    report.poll_errors += 1;
                }
                Ok(status) if !status.status.is_terminal() => {
                    debug!(job_id = %handle.job_id, status = %status.status, enriched = status.enriched, total = status.total, "monitor_jobs: still running");
                    report.still_running += 1;
                }
                Ok(status) => {
                    if let Some(finished) = self.finalize(&handle.job_id, &status).await {
                        report.finished.push(finished);
                    }
                }
            }
        }

        report
    }

    /// Poll until `job_id` is finalized, sleeping `poll` between passes.
    ///
    /// Returns None when the job is not tracked, or stops being tracked
    /// without this caller seeing it finish.
    pub async fn wait_for(&self, job_id: &str, poll: Duration) -> Option<FinishedJob> {
        debug!(%job_id, ?poll, "wait_for: called");
        loop {
            if !self.state.lock().await.contains(job_id) {
                return None;
            }
            let report = self.monitor_jobs().await;
            if let Some(finished) = report.finished.into_iter().find(|f| f.job_id == job_id) {
                return Some(finished);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Record a terminal job, fire its chain and trigger recalculation.
    ///
    /// Registry membership is the only gate: a job already removed is ignored.
    async fn finalize(&self, job_id: &str, status: &JobStatusReport) -> Option<FinishedJob> {
        let observed_at = Utc::now();

        let (handle, fire) = {
            let mut state = self.state.lock().await;
            let Some(handle) = state.remove(job_id) else {
                debug!(%job_id, "finalize: already finalized");
                return None;
            };

            let stat = RunStat::from_terminal(&handle, status, observed_at);
            if stat.had_failures() {
                warn!(
                    job_id = %handle.job_id,
                    tier = %handle.tier,
                    status = %stat.status,
                    enriched = stat.enriched,
                    total = stat.total,
                    errors = stat.errors,
                    "Tier scan finished with failures"
                );
            } else {
                info!(
                    job_id = %handle.job_id,
                    tier = %handle.tier,
                    enriched = stat.enriched,
                    total = stat.total,
                    fields_updated = stat.fields_updated,
                    duration_secs = stat.duration_secs,
                    "Tier scan finished"
                );
            }
            state.run_stats.insert(handle.tier, stat);
            state.total_estimated_cost += handle.estimated_cost;

            let fire = status.status != JobStatus::Error || self.config.chain_on_error;
            if !fire {
                let dropped = state.chains.drain_for(job_id);
                if !dropped.is_empty() {
                    warn!(%job_id, dropped = dropped.len(), "Batch errored, dropping chained launches");
                }
            }
            (handle, fire)
        };

        let chained_job_id = if fire { self.fire_chain(job_id).await } else { None };

        if let Err(e) = self
            .bounded(self.collaborators.recalculator.recalculate_touched_since(handle.started_at))
            .await
        {
            warn!(%job_id, error = %e, "Post-scan recalculation failed");
        }

        Some(FinishedJob {
            job_id: handle.job_id,
            tier: handle.tier,
            status: status.status,
            chained_job_id,
        })
    }

    /// Launch the first chain entry anchored on `finished_job_id` and move the
    /// remaining entries onto the new job.
    ///
    /// If an entry yields no job (no candidates or a failed launch) the next
    /// one on the same anchor is tried, so dependents are never stranded on
    /// an id that will not be polled again. Entries chained onto the finished
    /// job while a launch is in flight are picked up the same way.
    async fn fire_chain(&self, finished_job_id: &str) -> Option<String> {
        let today = self.now_local().date_naive();

        loop {
            let entry = self.state.lock().await.chains.take_first_for(finished_job_id)?;
            info!(after = %finished_job_id, tier = %entry.tier, mode = %entry.mode, "Firing chained launch");

            let result = self
                .launch_with(entry.tier, Some(entry.mode), today, |state, handle| {
                    let moved = state.chains.repoint(finished_job_id, &handle.job_id);
                    if moved > 0 {
                        info!(from = %finished_job_id, to = %handle.job_id, moved, "Re-pointed chain entries");
                    }
                })
                .await;

            match result {
                Ok(LaunchOutcome::Launched(handle)) => return Some(handle.job_id),
                Ok(LaunchOutcome::NoCandidates { tier }) => {
                    warn!(after = %finished_job_id, %tier, "Chained launch had no candidates");
                }
                Err(e) => {
                    warn!(after = %finished_job_id, tier = %entry.tier, error = %e, "Chained launch failed");
                }
            }
        }
    }

    /// Fire one trigger rule at `now` (operative timezone)
    pub async fn fire(&self, rule: &TriggerRule, now: DateTime<FixedOffset>) -> TriggerOutcome {
        debug!(rule = %rule.name, %now, "fire: called");

        if rule.calendar_gated {
            let decision = self.gate.should_skip(&now);
            if decision.skip {
                let reason = decision.reason.unwrap_or_default();
                info!(rule = %rule.name, %reason, "Trigger skipped by calendar");
                return TriggerOutcome::SkippedByCalendar { reason };
            }
        }

        let outcome = self.run_action(rule.action, now).await;
        match &outcome {
            TriggerOutcome::Failed { error } => warn!(rule = %rule.name, %error, "Trigger failed"),
            other => debug!(rule = %rule.name, outcome = ?other, "fire: done"),
        }
        outcome
    }

    /// Run a trigger's action without the calendar check
    pub async fn run_action(&self, action: TriggerAction, now: DateTime<FixedOffset>) -> TriggerOutcome {
        let today = now.date_naive();

        match action {
            TriggerAction::HotScan => self.hot_scan(today).await,
            TriggerAction::ActiveScan => {
                let fires = advance_biweekly(&mut self.state.lock().await.biweekly_toggle);
                if !fires {
                    info!("Active scan off-cycle this week");
                    return TriggerOutcome::OffCycle;
                }
                let result = self.launch_with(Tier::Active, None, today, |_, _| {}).await;
                launch_outcome(result, false)
            }
            TriggerAction::DormantScan => {
                if !in_dormant_window(today) {
                    debug!(%today, "run_action: dormant scan outside date window");
                    return TriggerOutcome::OffCycle;
                }
                let result = self.launch_with(Tier::Dormant, None, today, |_, _| {}).await;
                launch_outcome(result, false)
            }
            TriggerAction::ListingRefresh => match self.bounded(self.collaborators.listings.refresh_listings()).await {
                Ok(()) => {
                    info!("Listing refresh done");
                    TriggerOutcome::Completed
                }
                Err(e) => TriggerOutcome::Failed { error: e.to_string() },
            },
            TriggerAction::ScoreRecalculation => {
                match self
                    .bounded(self.collaborators.recalculator.recalculate_all_scores())
                    .await
                {
                    Ok(()) => {
                        info!("Score recalculation done");
                        TriggerOutcome::Completed
                    }
                    Err(e) => TriggerOutcome::Failed { error: e.to_string() },
                }
            }
            TriggerAction::Rerank => {
                match self
                    .bounded(self.collaborators.classifier.calculate_all_priorities())
                    .await
                {
                    Ok(report) => {
                        let snapshot = report.snapshot(Utc::now());
                        info!(
                            hot = snapshot.hot,
                            active = snapshot.active,
                            dormant = snapshot.dormant,
                            "Re-ranked complexes"
                        );
                        self.state.lock().await.last_ranking = Some(snapshot.clone());
                        TriggerOutcome::Ranked(snapshot)
                    }
                    Err(e) => TriggerOutcome::Failed { error: e.to_string() },
                }
            }
        }
    }

    /// Weekly HOT scan; on the monthly refresh it runs FULL and chains ACTIVE
    async fn hot_scan(&self, today: NaiveDate) -> TriggerOutcome {
        if !is_first_week_of_month(today) {
            let result = self.launch_with(Tier::Hot, None, today, |_, _| {}).await;
            return launch_outcome(result, false);
        }

        let result = self
            .launch_with(Tier::Hot, Some(Mode::Full), today, |state, handle| {
                let len = state
                    .chains
                    .push(ChainEntry::new(&handle.job_id, Tier::Active, Mode::Standard));
                info!(after = %handle.job_id, queue_len = len, "Monthly refresh: ACTIVE chained after HOT");
            })
            .await;
        launch_outcome(result, true)
    }

    /// Snapshot of the whole scheduler for observability
    pub async fn status(&self) -> SchedulerStatus {
        let now_local = self.now_local();
        let decision = self.gate.should_skip(&now_local);
        let generated_at = Utc::now();
        let state = self.state.lock().await;

        let mut active_jobs: Vec<ActiveJob> = state
            .active_jobs()
            .map(|handle| ActiveJob::new(handle.clone(), generated_at))
            .collect();
        active_jobs.sort_by_key(|job| job.handle.started_at);

        SchedulerStatus {
            generated_at,
            local_date: now_local.date_naive(),
            today_allowed: !decision.skip,
            skip_reason: decision.reason,
            active_job_count: active_jobs.len(),
            active_jobs,
            chain_queue: state.chains().entries().to_vec(),
            last_runs: state.run_stats.clone(),
            total_scans_launched: state.total_scans_launched(),
            total_estimated_cost: state.total_estimated_cost(),
            biweekly_toggle: state.biweekly_toggle(),
            last_ranking: state.last_ranking().cloned(),
        }
    }

    /// Write the status snapshot to the configured file, if any
    pub async fn publish_status(&self) {
        let Some(path) = self.config.status_file.clone() else {
            return;
        };
        let status = self.status().await;
        if let Err(e) = status.write_to(&path) {
            warn!(path = %path.display(), error = %e, "Failed to write status snapshot");
        }
    }
}

/// `chained` is reported only for a launch that actually happened
fn launch_outcome(result: Result<LaunchOutcome, ScanError>, chained: bool) -> TriggerOutcome {
    match result {
        Ok(LaunchOutcome::Launched(handle)) => TriggerOutcome::Launched {
            job_id: handle.job_id,
            tier: handle.tier,
            mode: handle.mode,
            chained,
        },
        Ok(LaunchOutcome::NoCandidates { tier }) => TriggerOutcome::NoCandidates { tier },
        Err(e) => TriggerOutcome::Failed { error: e.to_string() },
    }
}
