//! Domain types for tierscan
//!
//! Tiers, enrichment modes, job handles, chain entries, run statistics and
//! the classifier's ranking report. These are plain data; the orchestrator
//! in [`crate::scheduler`] owns their lifecycle.

mod job;
mod ranking;
mod tier;

pub use job::{ChainEntry, JobHandle, JobStatus, JobStatusReport, RunStat};
pub use ranking::{PriorityReport, RankedComplex, RankingSnapshot, ScanEstimate, TierBreakdown, TierSlice};
pub use tier::{Mode, Tier};
