//! Scan launch errors

use thiserror::Error;

use crate::backend::BackendError;
use crate::domain::Tier;

/// Why a tier scan could not be launched
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Priority classifier failed: {0}")]
    Classifier(#[source] BackendError),

    #[error("Batch launch for {tier} tier rejected: {source}")]
    Launch {
        tier: Tier,
        #[source]
        source: BackendError,
    },

    #[error("Launcher returned job id {0} which is already tracked")]
    DuplicateJob(String),
}
