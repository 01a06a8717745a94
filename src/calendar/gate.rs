//! Business-day gate for scheduled runs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Weekday};
use serde::Serialize;
use tracing::debug;

/// Answer from the gate: skip today or not, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipDecision {
    pub skip: bool,
    pub reason: Option<String>,
}

impl SkipDecision {
    pub fn allowed() -> Self {
        Self { skip: false, reason: None }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether scheduled work may run on a given civil date.
///
/// Blocks the weekly rest days, every date in the holiday calendar and any
/// operator-supplied extra date. Callers pass "now" already converted to the
/// operative timezone; the gate only looks at its calendar date.
#[derive(Debug, Clone, Default)]
pub struct CalendarGate {
    rest_days: Vec<Weekday>,
    holidays: BTreeMap<NaiveDate, String>,
    extra_dates: BTreeSet<NaiveDate>,
}

impl CalendarGate {
    pub fn new(rest_days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            rest_days: rest_days.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = (NaiveDate, String)>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn with_extra_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.extra_dates.extend(dates);
        self
    }

    pub fn rest_days(&self) -> &[Weekday] {
        &self.rest_days
    }

    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }

    pub fn should_skip_date(&self, date: NaiveDate) -> SkipDecision {
        let weekday = date.weekday();
        if self.rest_days.contains(&weekday) {
            return SkipDecision::skipped(format!("rest day ({})", weekday_name(weekday)));
        }

        if let Some(name) = self.holidays.get(&date) {
            return SkipDecision::skipped(format!("holiday: {}", name));
        }

        if self.extra_dates.contains(&date) {
            return SkipDecision::skipped("operator skip date");
        }

        SkipDecision::allowed()
    }

    pub fn should_skip<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> SkipDecision {
        let date = now.date_naive();
        let decision = self.should_skip_date(date);
        debug!(%date, skip = decision.skip, reason = ?decision.reason, "should_skip: evaluated");
        decision
    }

    pub fn is_run_allowed_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        !self.should_skip(now).skip
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
