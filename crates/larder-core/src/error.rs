//! The typed error returned by every generation and read-back operation.

use thiserror::Error;
use uuid::Uuid;

/// Boxed source error from a collaborator (catalog or store).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a plan could not be generated or read back.
///
/// Every variant is terminal for the call that produced it. The engine never
/// retries and never reports partial success.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid plan request: {0}")]
    InvalidRequest(String),

    #[error("recipe catalog unavailable")]
    CatalogUnavailable(#[source] BoxError),

    #[error("no recipes match the requested constraints")]
    NoEligibleRecipes,

    #[error("meal plan could not be persisted")]
    PersistenceFailure(#[source] BoxError),

    #[error("meal plan store unavailable")]
    StoreUnavailable(#[source] BoxError),

    #[error("meal plan {0} not found")]
    PlanNotFound(Uuid),
}

impl PlanError {
    pub(crate) fn catalog(err: anyhow::Error) -> Self {
        Self::CatalogUnavailable(err.into())
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::PersistenceFailure(err.into())
    }

    pub(crate) fn store(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(err.into())
    }
}
