//! In-memory backend for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    BackendError, BatchLauncher, Collaborators, JobStatusSource, ListingRefresher, PriorityClassifier, Recalculator,
};
use crate::domain::{JobStatus, JobStatusReport, Mode, PriorityReport, RankedComplex, Tier, TierSlice};

/// A launch the mock accepted
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub job_id: String,
    pub ids: Vec<i64>,
    pub mode: Mode,
}

/// Mock backend: scripted rankings, job ids "job-1", "job-2", ... and
/// statuses that tests flip by hand
pub struct MockBackend {
    report: PriorityReport,
    statuses: Mutex<HashMap<String, JobStatusReport>>,
    launches: Mutex<Vec<RecordedLaunch>>,
    recalculations: Mutex<Vec<DateTime<Utc>>>,
    next_id: AtomicUsize,
    classify_calls: AtomicUsize,
    status_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    full_recalc_calls: AtomicUsize,
    fail_launches: AtomicUsize,
    fail_classifier: AtomicBool,
    fail_recalc: AtomicBool,
    classifier_delay: Mutex<Duration>,
    reuse_job_id: Mutex<Option<String>>,
}

/// Build a tier slice with ids `start..start+count`
pub fn slice(start: i64, count: usize) -> TierSlice {
    TierSlice {
        count,
        complexes: (0..count as i64)
            .map(|i| RankedComplex {
                id: start + i,
                name: None,
                score: 100.0 - i as f64,
            })
            .collect(),
    }
}

/// Ranking with the given tier sizes; hot ids start at 1, active at 1000,
/// dormant at 5000
pub fn report(hot: usize, active: usize, dormant: usize) -> PriorityReport {
    let mut report = PriorityReport::default();
    report.tiers.hot = slice(1, hot);
    report.tiers.active = slice(1000, active);
    report.tiers.dormant = slice(5000, dormant);
    report.top = report.tiers.hot.complexes.clone();
    report
}

impl MockBackend {
    pub fn new(report: PriorityReport) -> Arc<Self> {
        debug!("MockBackend::new: called");
        Arc::new(Self {
            report,
            statuses: Mutex::new(HashMap::new()),
            launches: Mutex::new(Vec::new()),
            recalculations: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            classify_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            full_recalc_calls: AtomicUsize::new(0),
            fail_launches: AtomicUsize::new(0),
            fail_classifier: AtomicBool::new(false),
            fail_recalc: AtomicBool::new(false),
            classifier_delay: Mutex::new(Duration::ZERO),
            reuse_job_id: Mutex::new(None),
        })
    }

    pub fn with_tiers(hot: usize, active: usize, dormant: usize) -> Arc<Self> {
        Self::new(report(hot, active, dormant))
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::from_backend(self.clone())
    }

    /// Reject the next `count` launches with a 503
    pub fn fail_next_launches(&self, count: usize) {
        self.fail_launches.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_classifier(&self, fail: bool) {
        self.fail_classifier.store(fail, Ordering::SeqCst);
    }

    /// Scoped recalculations are still recorded, then answered with a 500
    pub fn set_fail_recalc(&self, fail: bool) {
        self.fail_recalc.store(fail, Ordering::SeqCst);
    }

    /// Hold every classifier call for `delay` before answering
    pub fn set_classifier_delay(&self, delay: Duration) {
        *self.classifier_delay.lock().unwrap() = delay;
    }

    /// Make the next launch hand back an id that is already in use
    pub fn reuse_job_id_once(&self, job_id: &str) {
        *self.reuse_job_id.lock().unwrap() = Some(job_id.to_string());
    }

    pub fn finish(&self, job_id: &str, status: JobStatus, enriched: u64, total: u64) {
        let report = JobStatusReport {
            status,
            enriched,
            total,
            total_fields_updated: enriched * 3,
            errors: total - enriched,
            started_at: None,
            completed_at: Some(Utc::now()),
        };
        self.statuses.lock().unwrap().insert(job_id.to_string(), report);
    }

    pub fn complete(&self, job_id: &str) {
        let total = self
            .launches()
            .iter()
            .find(|l| l.job_id == job_id)
            .map(|l| l.ids.len() as u64)
            .unwrap_or(0);
        self.finish(job_id, JobStatus::Completed, total, total);
    }

    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn recalculations(&self) -> Vec<DateTime<Utc>> {
        self.recalculations.lock().unwrap().clone()
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn full_recalc_calls(&self) -> usize {
        self.full_recalc_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriorityClassifier for MockBackend {
    async fn calculate_all_priorities(&self) -> Result<PriorityReport, BackendError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.classifier_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_classifier.load(Ordering::SeqCst) {
            return Err(BackendError::ApiError {
                status: 500,
                message: "classifier down".to_string(),
            });
        }
        Ok(self.report.clone())
    }
}

#[async_trait]
impl BatchLauncher for MockBackend {
    async fn enrich_by_ids(&self, ids: &[i64], mode: Mode) -> Result<String, BackendError> {
        debug!(count = ids.len(), %mode, "MockBackend::enrich_by_ids: called");
        let failing = self
            .fail_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BackendError::ApiError {
                status: 503,
                message: "enrichment worker busy".to_string(),
            });
        }

        let job_id = match self.reuse_job_id.lock().unwrap().take() {
            Some(id) => id,
            None => format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.launches.lock().unwrap().push(RecordedLaunch {
            job_id: job_id.clone(),
            ids: ids.to_vec(),
            mode,
        });
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.clone())
            .or_insert_with(JobStatusReport::running);
        Ok(job_id)
    }
}

#[async_trait]
impl JobStatusSource for MockBackend {
    async fn get_job_status(&self, job_id: &str) -> Result<JobStatusReport, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| BackendError::ApiError {
                status: 404,
                message: format!("unknown job {}", job_id),
            })
    }
}

#[async_trait]
impl Recalculator for MockBackend {
    async fn recalculate_touched_since(&self, since: DateTime<Utc>) -> Result<(), BackendError> {
        self.recalculations.lock().unwrap().push(since);
        if self.fail_recalc.load(Ordering::SeqCst) {
            return Err(BackendError::ApiError {
                status: 500,
                message: "scoring service unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn recalculate_all_scores(&self) -> Result<(), BackendError> {
        self.full_recalc_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ListingRefresher for MockBackend {
    async fn refresh_listings(&self) -> Result<(), BackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Tier-labelled helper for assertions
pub fn launched_tier(launch: &RecordedLaunch) -> Option<Tier> {
    match launch.ids.first() {
        Some(id) if *id < 1000 => Some(Tier::Hot),
        Some(id) if *id < 5000 => Some(Tier::Active),
        Some(_) => Some(Tier::Dormant),
        None => None,
    }
}
