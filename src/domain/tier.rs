//! Priority tiers and enrichment modes

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Priority bucket assigned to a complex by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Active,
    Dormant,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Active, Tier::Dormant];

    /// Mode used when a launch does not name one.
    ///
    /// HOT gets the expensive FULL pass only on the monthly refresh.
    pub fn default_mode(&self, monthly_refresh: bool) -> Mode {
        match self {
            Self::Hot if monthly_refresh => Mode::Full,
            Self::Hot => Mode::Standard,
            Self::Active => Mode::Standard,
            Self::Dormant => Mode::Fast,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hot => write!(f, "hot"),
            Self::Active => write!(f, "active"),
            Self::Dormant => write!(f, "dormant"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "active" => Ok(Self::Active),
            "dormant" => Ok(Self::Dormant),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

/// Enrichment intensity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Full,
    Standard,
    Fast,
    Turbo,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Full, Mode::Standard, Mode::Fast, Mode::Turbo];

    /// Estimated AI-search spend per complex, in USD
    pub fn unit_cost(&self) -> f64 {
        match self {
            Self::Full => 1.23,
            Self::Standard => 0.45,
            Self::Fast => 0.12,
            Self::Turbo => 0.05,
        }
    }

    /// Expected wall-clock time the batch worker spends per complex
    pub fn time_per_entity(&self) -> Duration {
        match self {
            Self::Full => Duration::from_secs(90),
            Self::Standard => Duration::from_secs(40),
            Self::Fast => Duration::from_secs(15),
            Self::Turbo => Duration::from_secs(6),
        }
    }

    pub fn estimate_cost(&self, entity_count: usize) -> f64 {
        entity_count as f64 * self.unit_cost()
    }

    /// Saturates instead of wrapping for absurdly large batches
    pub fn estimate_duration(&self, entity_count: usize) -> Duration {
        let count = u64::try_from(entity_count).unwrap_or(u64::MAX);
        Duration::from_secs(self.time_per_entity().as_secs().saturating_mul(count))
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Standard => write!(f, "standard"),
            Self::Fast => write!(f, "fast"),
            Self::Turbo => write!(f, "turbo"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "standard" => Ok(Self::Standard),
            "fast" => Ok(Self::Fast),
            "turbo" => Ok(Self::Turbo),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_default_modes() {
        assert_eq!(Tier::Hot.default_mode(true), Mode::Full);
        assert_eq!(Tier::Hot.default_mode(false), Mode::Standard);
        assert_eq!(Tier::Active.default_mode(true), Mode::Standard);
        assert_eq!(Tier::Dormant.default_mode(false), Mode::Fast);
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!("HOT".parse::<Tier>().unwrap(), Tier::Hot);
        assert_eq!("dormant".parse::<Tier>().unwrap(), Tier::Dormant);
        assert!("lukewarm".parse::<Tier>().is_err());
        assert_eq!(Tier::Active.to_string(), "active");
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&Mode::Turbo).unwrap();
        assert_eq!(json, "\"turbo\"");

        let mode: Mode = serde_json::from_str("\"standard\"").unwrap();
        assert_eq!(mode, Mode::Standard);
    }

    #[test]
    fn test_full_mode_hot_batch_cost() {
        let cost = Mode::Full.estimate_cost(50);
        assert!((cost - 61.50).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(Mode::Fast.estimate_duration(4), Duration::from_secs(60));
        assert_eq!(Mode::Full.estimate_duration(0), Duration::ZERO);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_estimate_duration_past_u32_range() {
        let count = 1usize << 33;
        assert_eq!(Mode::Turbo.estimate_duration(count), Duration::from_secs(6u64 << 33));
        assert_eq!(Mode::Full.estimate_duration(usize::MAX), Duration::from_secs(u64::MAX));
    }

    proptest! {
        #[test]
        fn prop_estimate_cost_is_count_times_unit(count in 0usize..10_000, idx in 0usize..4) {
            let mode = Mode::ALL[idx];
            prop_assert_eq!(mode.estimate_cost(count), count as f64 * mode.unit_cost());
        }

        #[test]
        fn prop_mode_round_trips_through_display(idx in 0usize..4) {
            let mode = Mode::ALL[idx];
            prop_assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
