//! Recurring trigger rules

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveTime, Weekday};
use serde::Serialize;

use crate::calendar::OperativeZone;

/// What a trigger does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerAction {
    HotScan,
    ActiveScan,
    DormantScan,
    ListingRefresh,
    ScoreRecalculation,
    Rerank,
}

impl TriggerAction {
    /// Tier scans and re-ranking respect the calendar; the daily
    /// maintenance passes run every day, rest days included
    pub fn calendar_gated(&self) -> bool {
        match self {
            Self::HotScan | Self::ActiveScan | Self::DormantScan | Self::Rerank => true,
            Self::ListingRefresh | Self::ScoreRecalculation => false,
        }
    }
}

impl std::fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HotScan => write!(f, "hot-scan"),
            Self::ActiveScan => write!(f, "active-scan"),
            Self::DormantScan => write!(f, "dormant-scan"),
            Self::ListingRefresh => write!(f, "listing-refresh"),
            Self::ScoreRecalculation => write!(f, "score-recalculation"),
            Self::Rerank => write!(f, "rerank"),
        }
    }
}

/// When a trigger fires, in the operative timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Weekly { weekday: Weekday, at: NaiveTime },
    Daily { at: NaiveTime },
}

impl Schedule {
    /// First firing strictly after `after`.
    ///
    /// Candidate days are taken from `after`'s wall clock and each firing is
    /// resolved through `zone`, so the offset can differ from `after`'s
    /// across a DST change.
    pub fn next_after(&self, after: &DateTime<FixedOffset>, zone: &OperativeZone) -> Option<DateTime<FixedOffset>> {
        let (weekday, at) = match *self {
            Self::Weekly { weekday, at } => (Some(weekday), at),
            Self::Daily { at } => (None, at),
        };

        (0..=7u64).find_map(|ahead| {
            let date = after.date_naive().checked_add_days(Days::new(ahead))?;
            if weekday.is_some_and(|w| date.weekday() != w) {
                return None;
            }
            let candidate = zone.localize(date.and_time(at))?;
            (candidate > *after).then_some(candidate)
        })
    }
}

/// A schedule, a calendar-gating flag and the action to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRule {
    pub name: String,
    pub schedule: Schedule,
    pub calendar_gated: bool,
    pub action: TriggerAction,
}

impl TriggerRule {
    pub fn new(action: TriggerAction, schedule: Schedule) -> Self {
        Self {
            name: action.to_string(),
            schedule,
            calendar_gated: action.calendar_gated(),
            action,
        }
    }
}
