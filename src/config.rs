//! Tierscan configuration types and loading

use chrono::{FixedOffset, NaiveDate, Weekday};
use chrono_tz::Tz;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calendar::{CalendarGate, OperativeZone};
use crate::scheduler::SchedulerConfig;
use crate::triggers::TriggersConfig;

/// Environment variable with comma-separated extra skip dates
pub const SKIP_DATES_ENV: &str = "TIERSCAN_SKIP_DATES";

/// Main Tierscan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web backend the collaborators talk to
    pub backend: BackendConfig,

    /// Operative timezone and business-day calendar
    pub calendar: CalendarConfig,

    /// Monitor, timeouts and chaining
    pub scheduler: SchedulerConfig,

    /// When each trigger fires
    pub triggers: TriggersConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .tierscan.yml
        let local_config = PathBuf::from(".tierscan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/tierscan/tierscan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tierscan").join("tierscan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Check everything that would otherwise only fail at first use
    pub fn validate(&self) -> Result<()> {
        self.calendar.offset()?;
        self.calendar.zone()?;
        self.calendar.rest_weekdays()?;
        self.triggers.rules()?;
        if self.scheduler.tick_interval_secs == 0 || self.scheduler.monitor_interval_secs == 0 {
            return Err(eyre!("Scheduler intervals must be greater than zero"));
        }
        Ok(())
    }
}

/// Web backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the web backend
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding an optional bearer token
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key_env: "TIERSCAN_API_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl BackendConfig {
    /// Bearer token, when the env var is set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|key| !key.trim().is_empty())
    }
}

/// One named holiday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Operative civil timezone as an IANA name; `null` falls back to
    /// `utc-offset-minutes`
    pub timezone: Option<String>,

    /// Fixed UTC offset, used only when `timezone` is unset
    #[serde(rename = "utc-offset-minutes")]
    pub utc_offset_minutes: i32,

    /// Weekly rest days ("fri", "saturday", ...)
    #[serde(rename = "rest-days")]
    pub rest_days: Vec<String>,

    pub holidays: Vec<Holiday>,

    /// YAML file with more holidays, same shape as `holidays`
    #[serde(rename = "holidays-file")]
    pub holidays_file: Option<PathBuf>,

    /// Operator-supplied dates to skip
    #[serde(rename = "extra-skip-dates")]
    pub extra_skip_dates: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: Some("Asia/Jerusalem".to_string()),
            utc_offset_minutes: 120,
            rest_days: vec!["fri".to_string(), "sat".to_string()],
            holidays: Vec::new(),
            holidays_file: None,
            extra_skip_dates: Vec::new(),
        }
    }
}

impl CalendarConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| eyre!("UTC offset out of range: {} minutes", self.utc_offset_minutes))
    }

    /// The zone dates and firing times are evaluated in
    pub fn zone(&self) -> Result<OperativeZone> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map(OperativeZone::from)
                .map_err(|e| eyre!("Unknown timezone {}: {}", name, e)),
            None => Ok(self.offset()?.into()),
        }
    }

    pub fn rest_weekdays(&self) -> Result<Vec<Weekday>> {
        self.rest_days
            .iter()
            .map(|day| day.parse::<Weekday>().map_err(|_| eyre!("Invalid rest day: {}", day)))
            .collect()
    }

    /// Assemble the gate from rest days, inline and file holidays, extra
    /// dates and the `TIERSCAN_SKIP_DATES` env var
    pub fn build_gate(&self) -> Result<CalendarGate> {
        let mut holidays = self.holidays.clone();
        if let Some(path) = &self.holidays_file {
            holidays.extend(load_holidays(path)?);
        }

        let mut extra = self.extra_skip_dates.clone();
        if let Ok(raw) = std::env::var(SKIP_DATES_ENV) {
            extra.extend(parse_skip_dates(&raw).context(format!("Invalid {}", SKIP_DATES_ENV))?);
        }

        let gate = CalendarGate::new(self.rest_weekdays()?)
            .with_holidays(holidays.into_iter().map(|h| (h.date, h.name)))
            .with_extra_dates(extra);
        tracing::debug!(
            rest_days = ?gate.rest_days(),
            holidays = gate.holiday_count(),
            "build_gate: done"
        );
        Ok(gate)
    }
}

fn load_holidays(path: &Path) -> Result<Vec<Holiday>> {
    let content = fs::read_to_string(path).context(format!("Failed to read holidays file {}", path.display()))?;
    serde_yaml::from_str(&content).context(format!("Failed to parse holidays file {}", path.display()))
}

/// Parse "2026-10-02,2026-10-03" (blank entries ignored)
pub fn parse_skip_dates(raw: &str) -> Result<Vec<NaiveDate>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").context(format!("Bad date: {}", s)))
        .collect()
}
