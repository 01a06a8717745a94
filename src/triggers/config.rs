//! Trigger schedule configuration

use chrono::{NaiveTime, Weekday};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

use super::rule::{Schedule, TriggerAction, TriggerRule};

/// Time of day, plus a weekday for weekly triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTime {
    /// Weekday name ("sun", "monday", ...); omitted for daily triggers
    #[serde(default)]
    pub weekday: Option<String>,

    /// "HH:MM" in the operative timezone
    pub at: String,
}

impl TriggerTime {
    fn weekly(weekday: &str, at: &str) -> Self {
        Self {
            weekday: Some(weekday.to_string()),
            at: at.to_string(),
        }
    }

    fn daily(at: &str) -> Self {
        Self {
            weekday: None,
            at: at.to_string(),
        }
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let at = NaiveTime::parse_from_str(&self.at, "%H:%M").context(format!("Invalid time of day: {}", self.at))?;
        match &self.weekday {
            Some(day) => {
                let weekday = day
                    .parse::<Weekday>()
                    .map_err(|_| eyre!("Invalid weekday: {}", day))?;
                Ok(Schedule::Weekly { weekday, at })
            }
            None => Ok(Schedule::Daily { at }),
        }
    }
}

/// Schedules for every trigger rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggersConfig {
    #[serde(rename = "hot-scan")]
    pub hot_scan: TriggerTime,

    #[serde(rename = "active-scan")]
    pub active_scan: TriggerTime,

    #[serde(rename = "dormant-scan")]
    pub dormant_scan: TriggerTime,

    /// Mid-week re-ranking (observability only)
    pub rerank: TriggerTime,

    #[serde(rename = "listing-refresh")]
    pub listing_refresh: TriggerTime,

    #[serde(rename = "score-recalculation")]
    pub score_recalculation: TriggerTime,
}

impl Default for TriggersConfig {
    fn default() -> Self {
        Self {
            hot_scan: TriggerTime::weekly("sun", "06:00"),
            active_scan: TriggerTime::weekly("mon", "06:00"),
            dormant_scan: TriggerTime::weekly("tue", "06:00"),
            rerank: TriggerTime::weekly("wed", "12:00"),
            listing_refresh: TriggerTime::daily("05:00"),
            score_recalculation: TriggerTime::daily("02:00"),
        }
    }
}

impl TriggersConfig {
    /// Build the trigger rules, failing on any unparseable schedule
    pub fn rules(&self) -> Result<Vec<TriggerRule>> {
        [
            (TriggerAction::HotScan, &self.hot_scan),
            (TriggerAction::ActiveScan, &self.active_scan),
            (TriggerAction::DormantScan, &self.dormant_scan),
            (TriggerAction::Rerank, &self.rerank),
            (TriggerAction::ListingRefresh, &self.listing_refresh),
            (TriggerAction::ScoreRecalculation, &self.score_recalculation),
        ]
        .into_iter()
        .map(|(action, time)| {
            let schedule = time.schedule().context(format!("Bad schedule for {}", action))?;
            Ok(TriggerRule::new(action, schedule))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = TriggersConfig::default().rules().unwrap();
        assert_eq!(rules.len(), 6);

        let hot = rules.iter().find(|r| r.action == TriggerAction::HotScan).unwrap();
        assert_eq!(
            hot.schedule,
            Schedule::Weekly {
                weekday: Weekday::Sun,
                at: NaiveTime::from_hms_opt(6, 0, 0).unwrap()
            }
        );

        let refresh = rules.iter().find(|r| r.action == TriggerAction::ListingRefresh).unwrap();
        assert!(matches!(refresh.schedule, Schedule::Daily { .. }));
        assert!(!refresh.calendar_gated);
    }

    #[test]
    fn test_deserialize_overrides() {
        let yaml = r#"
hot-scan:
  weekday: thursday
  at: "07:30"
listing-refresh:
  at: "04:15"
"#;
        let config: TriggersConfig = serde_yaml::from_str(yaml).unwrap();
        let rules = config.rules().unwrap();
        let hot = rules.iter().find(|r| r.action == TriggerAction::HotScan).unwrap();
        assert_eq!(
            hot.schedule,
            Schedule::Weekly {
                weekday: Weekday::Thu,
                at: NaiveTime::from_hms_opt(7, 30, 0).unwrap()
            }
        );
        // untouched entries keep defaults
        assert_eq!(config.rerank, TriggerTime::weekly("wed", "12:00"));
    }

    #[test]
    fn test_invalid_schedule_is_rejected() {
        let config = TriggersConfig {
            dormant_scan: TriggerTime::weekly("someday", "06:00"),
            ..Default::default()
        };
        assert!(config.rules().is_err());

        let config = TriggersConfig {
            rerank: TriggerTime::daily("25:61"),
            ..Default::default()
        };
        assert!(config.rules().is_err());
    }
}
