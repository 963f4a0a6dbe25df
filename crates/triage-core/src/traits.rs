use crate::error::AppError;
use crate::predictor::Prediction;
use crate::scheduler::QTable;

/// Predicts a risk class distribution from a feature vector.
///
/// Implementations are synchronous and CPU-bound; the desk calls them while
/// holding its lock, so they should not block on I/O.
pub trait RiskModel: Send + Sync {
    /// Short identifier reported by health checks and logs.
    fn name(&self) -> &str;

    /// Scores one feature vector, ordered as [`crate::vitals::FEATURE_NAMES`].
    fn predict(&self, features: &[f64]) -> Result<Prediction, AppError>;
}

/// Persists the scheduler's learned Q-table between runs.
pub trait PolicyStore: Send + Sync {
    /// Load the stored table. Returns `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<QTable>, AppError>;

    fn save(&self, table: &QTable) -> Result<(), AppError>;
}

/// A no-op PolicyStore for use when persistence is not needed.
#[derive(Debug, Clone, Default)]
pub struct NullPolicyStore;

impl PolicyStore for NullPolicyStore {
    fn load(&self) -> Result<Option<QTable>, AppError> {
        Ok(None)
    }

    fn save(&self, _table: &QTable) -> Result<(), AppError> {
        Ok(())
    }
}
