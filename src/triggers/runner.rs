//! Ticker loops that drive the orchestrator
//!
//! Two independent loops: the trigger ticker, which fires due rules, and the
//! job monitor, which polls in-flight batches on its own interval regardless
//! of the calendar.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::rule::TriggerRule;
use crate::calendar::OperativeZone;
use crate::scheduler::Orchestrator;

/// Trigger rules with their next firing time
pub struct TriggerSet {
    zone: OperativeZone,
    entries: Vec<(TriggerRule, Option<DateTime<FixedOffset>>)>,
}

impl TriggerSet {
    pub fn new(rules: Vec<TriggerRule>, zone: OperativeZone, now: DateTime<FixedOffset>) -> Self {
        let entries = rules
            .into_iter()
            .map(|rule| {
                let next = rule.schedule.next_after(&now, &zone);
                if next.is_none() {
                    warn!(rule = %rule.name, "Trigger has no upcoming firing time");
                }
                (rule, next)
            })
            .collect();
        Self { zone, entries }
    }

    /// Rules due at `now`; each is rescheduled past `now`
    pub fn take_due(&mut self, now: DateTime<FixedOffset>) -> Vec<TriggerRule> {
        let mut due = Vec::new();
        for (rule, next) in self.entries.iter_mut() {
            if next.is_some_and(|at| at <= now) {
                due.push(rule.clone());
                *next = rule.schedule.next_after(&now, &self.zone);
                debug!(rule = %rule.name, next = ?next, "take_due: rescheduled");
            }
        }
        due
    }

    /// Next firing time per rule, soonest first
    pub fn upcoming(&self) -> Vec<(String, DateTime<FixedOffset>)> {
        let mut upcoming: Vec<_> = self
            .entries
            .iter()
            .filter_map(|(rule, next)| next.map(|at| (rule.name.clone(), at)))
            .collect();
        upcoming.sort_by_key(|(_, at)| *at);
        upcoming
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fire due triggers until shutdown.
///
/// Each firing runs in its own task, so a slow backend call or a failure in
/// one handler never holds up the others.
pub async fn run_triggers(
    orchestrator: Arc<Orchestrator>,
    mut triggers: TriggerSet,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    info!(
        rules = triggers.len(),
        tick_secs = orchestrator.config().tick_interval_secs,
        "Trigger loop started"
    );
    for (name, at) in triggers.upcoming() {
        info!(rule = %name, next = %at, "Scheduled trigger");
    }

    let mut interval = tokio::time::interval(orchestrator.config().tick_interval());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = orchestrator.now_local();
                for rule in triggers.take_due(now) {
                    let orchestrator = orchestrator.clone();
                    tokio::spawn(async move {
                        let outcome = orchestrator.fire(&rule, now).await;
                        debug!(rule = %rule.name, ?outcome, "run_triggers: handler finished");
                        orchestrator.publish_status().await;
                    });
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Trigger loop shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Poll in-flight jobs until shutdown
pub async fn run_monitor(orchestrator: Arc<Orchestrator>, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
    info!(
        interval_secs = orchestrator.config().monitor_interval_secs,
        "Job monitor started"
    );

    let mut interval = tokio::time::interval(orchestrator.config().monitor_interval());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = orchestrator.monitor_jobs().await;
                if !report.finished.is_empty() || report.poll_errors > 0 {
                    info!(
                        finished = report.finished.len(),
                        still_running = report.still_running,
                        poll_errors = report.poll_errors,
                        "Monitor pass complete"
                    );
                }
                orchestrator.publish_status().await;
            }
            _ = shutdown_rx.recv() => {
                info!("Job monitor shutting down");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::{Schedule, TriggerAction};
    use chrono::{NaiveTime, TimeZone, Weekday};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn local(d: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        offset().with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    fn trigger_set(now: DateTime<FixedOffset>) -> TriggerSet {
        TriggerSet::new(rules(), offset().into(), now)
    }

    fn rules() -> Vec<TriggerRule> {
        vec![
            TriggerRule::new(
                TriggerAction::HotScan,
                Schedule::Weekly {
                    weekday: Weekday::Sun,
                    at: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                },
            ),
            TriggerRule::new(
                TriggerAction::ListingRefresh,
                Schedule::Daily {
                    at: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
                },
            ),
        ]
    }

    #[test]
    fn test_nothing_due_before_first_firing() {
        let mut set = trigger_set(local(15, 12, 0));
        assert!(set.take_due(local(15, 23, 59)).is_empty());
    }

    #[test]
    fn test_due_rules_fire_once_and_reschedule() {
        let mut set = trigger_set(local(15, 12, 0));

        let due = set.take_due(local(16, 5, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].action, TriggerAction::ListingRefresh);

        // same instant again: already rescheduled to tomorrow
        assert!(set.take_due(local(16, 5, 0)).is_empty());

        let due = set.take_due(local(18, 6, 0));
        let actions: Vec<_> = due.iter().map(|r| r.action).collect();
        assert!(actions.contains(&TriggerAction::HotScan));
        assert!(actions.contains(&TriggerAction::ListingRefresh));
    }

    #[test]
    fn test_upcoming_sorted() {
        let set = trigger_set(local(15, 12, 0));
        let upcoming = set.upcoming();
        assert_eq!(upcoming[0].0, "listing-refresh");
        assert_eq!(upcoming[0].1, local(16, 5, 0));
        assert_eq!(upcoming[1].1, local(18, 6, 0));
        assert_eq!(set.len(), 2);
    }
}
