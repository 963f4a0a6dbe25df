pub mod config;
pub mod desk;
pub mod error;
pub mod models;
pub mod policy_store;
pub mod predictor;
pub mod queue;
pub mod scheduler;
pub mod traits;
pub mod vitals;

#[cfg(test)]
mod testutil;

pub use config::DeskConfig;
pub use desk::{FeedbackReceipt, PolicyStats, TriageDesk};
pub use error::AppError;
pub use models::{RiskAssessment, RiskLevel};
pub use policy_store::JsonFilePolicyStore;
pub use predictor::{LinearRiskModel, ModelArtifact, Prediction, VitalsRuleModel, assess};
pub use queue::{PriorityCounts, QueueEntry};
pub use scheduler::{LearningConfig, Outcome, QLearningScheduler, QTable, SchedulingAction};
pub use traits::{NullPolicyStore, PolicyStore, RiskModel};
pub use vitals::VitalSigns;
