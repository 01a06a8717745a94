//! Collaborator contracts for the enrichment backend
//!
//! The orchestrator never touches the database or the AI search service
//! directly. Everything it needs from the outside world goes through the
//! traits below; [`HttpBackend`] implements all of them against the web
//! backend's REST surface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{JobStatusReport, Mode, PriorityReport};

mod error;
mod http;
#[cfg(test)]
pub mod mock;

pub use error::BackendError;
pub use http::HttpBackend;

/// Ranks the live population into hot/active/dormant tiers
#[async_trait]
pub trait PriorityClassifier: Send + Sync {
    async fn calculate_all_priorities(&self) -> Result<PriorityReport, BackendError>;
}

/// Starts an asynchronous enrichment batch and returns its job id
#[async_trait]
pub trait BatchLauncher: Send + Sync {
    async fn enrich_by_ids(&self, ids: &[i64], mode: Mode) -> Result<String, BackendError>;
}

/// Reports the current state of a launched batch
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn get_job_status(&self, job_id: &str) -> Result<JobStatusReport, BackendError>;
}

/// Score recalculation (SSI/IAI) after enrichment
#[async_trait]
pub trait Recalculator: Send + Sync {
    /// Recalculate only complexes touched since `since`
    async fn recalculate_touched_since(&self, since: DateTime<Utc>) -> Result<(), BackendError>;

    /// Daily full recalculation pass
    async fn recalculate_all_scores(&self) -> Result<(), BackendError>;
}

/// Daily refresh of external listings
#[async_trait]
pub trait ListingRefresher: Send + Sync {
    async fn refresh_listings(&self) -> Result<(), BackendError>;
}

/// The set of collaborators an orchestrator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn PriorityClassifier>,
    pub launcher: Arc<dyn BatchLauncher>,
    pub status: Arc<dyn JobStatusSource>,
    pub recalculator: Arc<dyn Recalculator>,
    pub listings: Arc<dyn ListingRefresher>,
}

impl Collaborators {
    /// Use one backend object for every collaborator role
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: PriorityClassifier + BatchLauncher + JobStatusSource + Recalculator + ListingRefresher + 'static,
    {
        Self {
            classifier: backend.clone(),
            launcher: backend.clone(),
            status: backend.clone(),
            recalculator: backend.clone(),
            listings: backend,
        }
    }
}
