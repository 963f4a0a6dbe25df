use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::DeskConfig;
use crate::error::AppError;
use crate::models::RiskLevel;
use crate::policy_store::JsonFilePolicyStore;
use crate::predictor::{LinearRiskModel, VitalsRuleModel, assess};
use crate::queue::{PatientRecord, PriorityCounts, QueueEntry, rank};
use crate::scheduler::{Outcome, QLearningScheduler, QueueSnapshot, SchedulingAction, state_key};
use crate::traits::{NullPolicyStore, PolicyStore, RiskModel};
use crate::vitals::VitalSigns;

/// Upper bound on remembered scheduling decisions awaiting feedback.
const MAX_TRACKED_DECISIONS: usize = 1024;

/// Result of reporting an outcome for a patient.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReceipt {
    pub patient_id: String,
    /// True if a recorded scheduling decision was updated.
    pub learned: bool,
    pub reward: Option<f64>,
    pub policy_saved: bool,
}

/// Snapshot of the scheduler's learning progress.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyStats {
    pub epsilon: f64,
    pub states: usize,
    pub feedback_received: u64,
    pub pending_decisions: usize,
}

/// The last scheduling decision taken for a low-risk patient.
#[derive(Debug, Clone)]
struct Decision {
    state: String,
    action: SchedulingAction,
    confidence: f64,
}

struct DeskState {
    patients: Vec<PatientRecord>,
    scheduler: QLearningScheduler,
    decisions: HashMap<String, Decision>,
    next_seq: u64,
    feedback_received: u64,
}

impl DeskState {
    fn rank(&mut self, now: DateTime<Utc>) -> Vec<QueueEntry> {
        let ranked = rank(&mut self.patients, &mut self.scheduler, now);

        for entry in &ranked {
            if let (Some(state), Some(action)) = (&entry.rl_state, entry.rl_action) {
                self.decisions.insert(
                    entry.patient_id.clone(),
                    Decision {
                        state: state.clone(),
                        action,
                        confidence: entry.assessment.confidence_score,
                    },
                );
            }
        }

        if self.decisions.len() > MAX_TRACKED_DECISIONS {
            let queued: Vec<&str> = self.patients.iter().map(|p| p.patient_id.as_str()).collect();
            self.decisions.retain(|id, _| queued.contains(&id.as_str()));
        }

        ranked
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::from_assessments(
            self.patients
                .iter()
                .map(|p| (p.assessment.risk_level, p.assessment.confidence_score)),
        )
    }
}

/// In-memory triage queue: assesses arriving patients, keeps them ranked,
/// and learns a scheduling policy for low-risk patients from feedback.
///
/// All state sits behind one async mutex; every operation ranks and mutates
/// under the same lock, so concurrent requests never see a half-updated queue.
pub struct TriageDesk {
    model: Box<dyn RiskModel>,
    store: Box<dyn PolicyStore>,
    save_interval: u64,
    state: Mutex<DeskState>,
}

impl TriageDesk {
    pub fn new(
        model: Box<dyn RiskModel>,
        store: Box<dyn PolicyStore>,
        scheduler: QLearningScheduler,
    ) -> Self {
        Self {
            model,
            store,
            save_interval: 10,
            state: Mutex::new(DeskState {
                patients: Vec::new(),
                scheduler,
                decisions: HashMap::new(),
                next_seq: 1,
                feedback_received: 0,
            }),
        }
    }

    /// Persist the policy after every `interval` feedback reports.
    pub fn with_save_interval(mut self, interval: u64) -> Self {
        self.save_interval = interval.max(1);
        self
    }

    /// Build a desk from configuration: load the model artifact (or fall back
    /// to the rule model), open the policy store and restore the learned table.
    pub fn from_config(config: &DeskConfig) -> Result<Self, AppError> {
        let model: Box<dyn RiskModel> = match &config.model_path {
            Some(path) => Box::new(LinearRiskModel::from_json_file(path)?),
            None => {
                tracing::info!("No model artifact configured, using vitals rule model");
                Box::new(VitalsRuleModel)
            }
        };

        let store: Box<dyn PolicyStore> = match &config.policy_path {
            Some(path) => Box::new(JsonFilePolicyStore::new(path)),
            None => Box::new(NullPolicyStore),
        };

        let scheduler = match config.seed {
            Some(seed) => QLearningScheduler::with_seed(config.learning, seed),
            None => QLearningScheduler::new(config.learning),
        };
        let scheduler = match store.load()? {
            Some(table) => scheduler.with_table(table),
            None => scheduler,
        };

        Ok(Self::new(model, store, scheduler).with_save_interval(config.policy_save_interval))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.patients.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Assess a new patient, add them to the queue and return their ranked entry.
    pub async fn admit(&self, vitals: VitalSigns) -> Result<QueueEntry, AppError> {
        let now = Utc::now();
        let assessment = assess(self.model.as_ref(), vitals, now)?;

        let mut state = self.state.lock().await;
        let patient_id = format!("patient_{}_{}", state.next_seq, now.timestamp());
        state.next_seq += 1;

        let risk_level = assessment.risk_level;
        state.patients.push(PatientRecord {
            patient_id: patient_id.clone(),
            assessment,
        });

        let entry = state
            .rank(now)
            .into_iter()
            .find(|e| e.patient_id == patient_id)
            .ok_or_else(|| AppError::NotFound(patient_id.clone()))?;

        tracing::info!(
            %patient_id,
            %risk_level,
            priority = entry.final_priority(),
            position = entry.queue_position,
            wait_minutes = entry.estimated_wait_minutes,
            "Patient admitted"
        );

        Ok(entry)
    }

    /// The current queue, highest priority first.
    pub async fn queue(&self) -> Vec<QueueEntry> {
        let mut state = self.state.lock().await;
        if state.patients.is_empty() {
            return Vec::new();
        }
        state.rank(Utc::now())
    }

    /// Recompute every priority for the elapsed time and report level counts.
    pub async fn refresh_priorities(&self) -> PriorityCounts {
        let mut state = self.state.lock().await;
        let ranked = state.rank(Utc::now());
        let counts = PriorityCounts::from_entries(&ranked);
        tracing::info!(
            total = counts.total,
            high = counts.high,
            medium = counts.medium,
            low = counts.low,
            "Priorities updated"
        );
        counts
    }

    /// Remove every waiting patient, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let removed: Vec<PatientRecord> = std::mem::take(&mut state.patients);
        for record in &removed {
            state.decisions.remove(&record.patient_id);
        }
        tracing::info!(count = removed.len(), "Queue cleared");
        removed.len()
    }

    /// Remove and return the highest-priority patient.
    pub async fn next_patient(&self) -> Result<QueueEntry, AppError> {
        let mut state = self.state.lock().await;
        if state.patients.is_empty() {
            return Err(AppError::EmptyQueue);
        }

        let next = state
            .rank(Utc::now())
            .into_iter()
            .next()
            .ok_or(AppError::EmptyQueue)?;
        state.patients.retain(|p| p.patient_id != next.patient_id);

        tracing::info!(
            patient_id = %next.patient_id,
            risk_level = %next.assessment.risk_level,
            remaining = state.patients.len(),
            "Patient called"
        );

        Ok(next)
    }

    /// Learn from the outcome of a patient's visit.
    ///
    /// Feedback for patients without a recorded scheduling decision (all
    /// high- and medium-risk patients, or unknown ids) is accepted but does
    /// not change the policy.
    pub async fn record_feedback(
        &self,
        patient_id: &str,
        outcome: Outcome,
    ) -> Result<FeedbackReceipt, AppError> {
        outcome.validate()?;

        let mut state = self.state.lock().await;
        state.feedback_received += 1;

        let mut receipt = FeedbackReceipt {
            patient_id: patient_id.to_string(),
            learned: false,
            reward: None,
            policy_saved: false,
        };

        if let Some(decision) = state.decisions.remove(patient_id) {
            let reward = state
                .scheduler
                .reward(decision.action, RiskLevel::Low, &outcome);
            let next_state = state_key(
                RiskLevel::Low,
                decision.confidence,
                &state.snapshot(),
                outcome.recorded_at,
            );
            state
                .scheduler
                .update(&decision.state, decision.action, reward, &next_state);

            tracing::info!(
                %patient_id,
                state = %decision.state,
                action = %decision.action,
                reward,
                "Policy updated from feedback"
            );
            receipt.learned = true;
            receipt.reward = Some(reward);
        } else {
            tracing::debug!(%patient_id, "Feedback without a scheduling decision");
        }

        if state.feedback_received % self.save_interval == 0 {
            match self.store.save(state.scheduler.q_table()) {
                Ok(()) => receipt.policy_saved = true,
                Err(e) => tracing::warn!(error = %e, "Failed to persist policy"),
            }
        }

        Ok(receipt)
    }

    /// Save the learned policy now.
    pub async fn persist_policy(&self) -> Result<(), AppError> {
        let state = self.state.lock().await;
        self.store.save(state.scheduler.q_table())?;
        tracing::info!(states = state.scheduler.q_table().len(), "Policy persisted");
        Ok(())
    }

    pub async fn policy_stats(&self) -> PolicyStats {
        let state = self.state.lock().await;
        PolicyStats {
            epsilon: state.scheduler.epsilon(),
            states: state.scheduler.q_table().len(),
            feedback_received: state.feedback_received,
            pending_decisions: state.decisions.len(),
        }
    }
}
