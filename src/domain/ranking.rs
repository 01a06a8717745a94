//! Classifier output: complexes bucketed into priority tiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::{Mode, Tier};

/// How many leading ids a ranking snapshot keeps for display
const SNAPSHOT_TOP_IDS: usize = 10;

/// One complex as ranked by the priority classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedComplex {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "priority_score", alias = "priorityScore")]
    pub score: f64,
}

/// Ordered members of a single tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSlice {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub complexes: Vec<RankedComplex>,
}

impl TierSlice {
    pub fn ids(&self) -> Vec<i64> {
        self.complexes.iter().map(|c| c.id).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierBreakdown {
    #[serde(default)]
    pub hot: TierSlice,
    #[serde(default)]
    pub active: TierSlice,
    #[serde(default)]
    pub dormant: TierSlice,
}

/// Full classification pass over the monitored population.
///
/// `hot` is already bounded to the classifier's top-N; `active` and
/// `dormant` hold everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityReport {
    #[serde(default, rename = "top_50", alias = "top")]
    pub top: Vec<RankedComplex>,
    #[serde(default)]
    pub tiers: TierBreakdown,
}

impl PriorityReport {
    pub fn slice(&self, tier: Tier) -> &TierSlice {
        match tier {
            Tier::Hot => &self.tiers.hot,
            Tier::Active => &self.tiers.active,
            Tier::Dormant => &self.tiers.dormant,
        }
    }

    /// Candidate ids for a launch of `tier`, in classifier order
    pub fn candidate_ids(&self, tier: Tier) -> Vec<i64> {
        self.slice(tier).ids()
    }

    /// What scanning every tier in its default mode would cost right now
    pub fn scan_estimates(&self, monthly_refresh: bool) -> Vec<ScanEstimate> {
        Tier::ALL
            .into_iter()
            .map(|tier| {
                let slice = self.slice(tier);
                let count = slice.count.max(slice.complexes.len());
                let mode = tier.default_mode(monthly_refresh);
                ScanEstimate {
                    tier,
                    mode,
                    count,
                    cost: mode.estimate_cost(count),
                }
            })
            .collect()
    }

    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> RankingSnapshot {
        RankingSnapshot {
            taken_at,
            hot: self.tiers.hot.count.max(self.tiers.hot.complexes.len()),
            active: self.tiers.active.count.max(self.tiers.active.complexes.len()),
            dormant: self.tiers.dormant.count.max(self.tiers.dormant.complexes.len()),
            top_ids: self.top.iter().take(SNAPSHOT_TOP_IDS).map(|c| c.id).collect(),
        }
    }
}

/// Projected spend for one tier scanned in its default mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanEstimate {
    pub tier: Tier,
    pub mode: Mode,
    pub count: usize,
    pub cost: f64,
}

/// Tier sizes captured by the re-ranking trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub taken_at: DateTime<Utc>,
    pub hot: usize,
    pub active: usize,
    pub dormant: usize,
    pub top_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "top_50": [
                {"id": 11, "name": "Bat Yam North", "priority_score": 91.5},
                {"id": 12, "priority_score": 88.0}
            ],
            "tiers": {
                "hot": {"count": 2, "complexes": [{"id": 11, "priority_score": 91.5}, {"id": 12, "priority_score": 88.0}]},
                "active": {"count": 1, "complexes": [{"id": 20, "priorityScore": 40.0}]},
                "dormant": {"count": 0, "complexes": []}
            }
        }"#
    }

    #[test]
    fn test_deserialize_classifier_payload() {
        let report: PriorityReport = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(report.top.len(), 2);
        assert_eq!(report.top[0].name.as_deref(), Some("Bat Yam North"));
        assert_eq!(report.candidate_ids(Tier::Hot), vec![11, 12]);
        assert_eq!(report.candidate_ids(Tier::Active), vec![20]);
        assert!(report.candidate_ids(Tier::Dormant).is_empty());
        assert!((report.tiers.active.complexes[0].score - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_tiers_default_to_empty() {
        let report: PriorityReport = serde_json::from_str(r#"{"tiers": {"hot": {"count": 0}}}"#).unwrap();
        assert!(report.candidate_ids(Tier::Hot).is_empty());
        assert!(report.candidate_ids(Tier::Dormant).is_empty());
    }

    #[test]
    fn test_scan_estimates_follow_monthly_refresh() {
        let report: PriorityReport = serde_json::from_str(sample_json()).unwrap();

        let monthly = report.scan_estimates(true);
        assert_eq!(monthly[0].tier, Tier::Hot);
        assert_eq!(monthly[0].mode, Mode::Full);
        assert!((monthly[0].cost - 2.46).abs() < 1e-9);

        let weekly = report.scan_estimates(false);
        assert_eq!(weekly[0].mode, Mode::Standard);
        assert!((weekly[0].cost - 0.90).abs() < 1e-9);
        assert_eq!((weekly[1].mode, weekly[1].count), (Mode::Standard, 1));
        assert_eq!((weekly[2].mode, weekly[2].count), (Mode::Fast, 0));
    }

    #[test]
    fn test_snapshot_counts() {
        let report: PriorityReport = serde_json::from_str(sample_json()).unwrap();
        let now = Utc::now();
        let snap = report.snapshot(now);
        assert_eq!(snap.taken_at, now);
        assert_eq!((snap.hot, snap.active, snap.dormant), (2, 1, 0));
        assert_eq!(snap.top_ids, vec![11, 12]);
    }
}
