//! Tabular Q-learning scheduler for low-risk patients.
//!
//! High- and medium-risk patients are ordered purely by their priority score.
//! Low-risk patients additionally get a scheduling action chosen by an
//! epsilon-greedy policy; the action shifts their priority and adds a delay
//! to their wait estimate. Outcome feedback updates the policy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::RiskLevel;

/// Learned action values: state key → action → value.
pub type QTable = BTreeMap<String, BTreeMap<SchedulingAction, f64>>;

/// Scheduling decision for a low-risk patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchedulingAction {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "delay_15")]
    Delay15,
    #[serde(rename = "delay_30")]
    Delay30,
    #[serde(rename = "delay_60")]
    Delay60,
    #[serde(rename = "delay_120")]
    Delay120,
}

impl SchedulingAction {
    /// All actions, in tie-breaking order.
    pub const ALL: [SchedulingAction; 5] = [
        SchedulingAction::Immediate,
        SchedulingAction::Delay15,
        SchedulingAction::Delay30,
        SchedulingAction::Delay60,
        SchedulingAction::Delay120,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingAction::Immediate => "immediate",
            SchedulingAction::Delay15 => "delay_15",
            SchedulingAction::Delay30 => "delay_30",
            SchedulingAction::Delay60 => "delay_60",
            SchedulingAction::Delay120 => "delay_120",
        }
    }

    /// Minutes added to the patient's estimated wait.
    pub fn delay_minutes(&self) -> u32 {
        match self {
            SchedulingAction::Immediate => 0,
            SchedulingAction::Delay15 => 15,
            SchedulingAction::Delay30 => 30,
            SchedulingAction::Delay60 => 60,
            SchedulingAction::Delay120 => 120,
        }
    }

    /// Adjustment added to the patient's priority score.
    pub fn priority_boost(&self) -> f64 {
        match self {
            SchedulingAction::Immediate => 10.0,
            SchedulingAction::Delay15 => 2.0,
            SchedulingAction::Delay30 => 0.0,
            SchedulingAction::Delay60 => -3.0,
            SchedulingAction::Delay120 => -8.0,
        }
    }
}

impl fmt::Display for SchedulingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SchedulingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchedulingAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("Unknown scheduling action: {s}"))
    }
}

/// Aggregate view of the queue used to build policy states.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueSnapshot {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub average_confidence: f64,
}

impl QueueSnapshot {
    pub fn from_assessments(assessments: impl IntoIterator<Item = (RiskLevel, f64)>) -> Self {
        let mut snapshot = QueueSnapshot::default();
        let mut confidence_sum = 0.0;
        for (level, confidence) in assessments {
            snapshot.total += 1;
            confidence_sum += confidence;
            match level {
                RiskLevel::High => snapshot.high += 1,
                RiskLevel::Medium => snapshot.medium += 1,
                RiskLevel::Low => snapshot.low += 1,
            }
        }
        if snapshot.total > 0 {
            snapshot.average_confidence = confidence_sum / snapshot.total as f64;
        }
        snapshot
    }
}

/// Coarse time-of-day bucket, read in UTC.
pub fn time_bucket(now: DateTime<Utc>) -> &'static str {
    match now.hour() {
        6..=11 => "morning",
        12..=17 => "afternoon",
        _ => "evening",
    }
}

/// Policy state key for a patient given the current queue.
pub fn state_key(
    risk: RiskLevel,
    confidence: f64,
    snapshot: &QueueSnapshot,
    now: DateTime<Utc>,
) -> String {
    let confidence_bucket = (confidence.clamp(0.0, 1.0) * 10.0).floor() as u32;
    format!(
        "{}_{}_{}_{}_{}",
        risk.as_str(),
        confidence_bucket,
        snapshot.total.min(10),
        snapshot.high.min(5),
        time_bucket(now)
    )
}

/// Measured result of a scheduling decision, reported after the visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub actual_wait_minutes: u32,
    /// Patient satisfaction in `[0.0, 1.0]`
    pub satisfaction_score: f64,
    /// Resource utilisation efficiency in `[0.0, 1.0]`
    pub resource_utilization: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Outcome {
    /// Both scores must lie in `[0.0, 1.0]`.
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("satisfaction_score", self.satisfaction_score),
            ("resource_utilization", self.resource_utilization),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::ValidationError(format!(
                    "{field} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Hyper-parameters of the Q-learning update and exploration schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            epsilon: 0.1,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
        }
    }
}

/// Epsilon-greedy tabular Q-learning over [`SchedulingAction`]s.
#[derive(Debug)]
pub struct QLearningScheduler {
    config: LearningConfig,
    epsilon: f64,
    q_table: QTable,
    rng: StdRng,
}

impl QLearningScheduler {
    pub fn new(config: LearningConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic exploration, for tests and reproducible simulations.
    pub fn with_seed(config: LearningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: LearningConfig, rng: StdRng) -> Self {
        Self {
            epsilon: config.epsilon,
            config,
            q_table: QTable::new(),
            rng,
        }
    }

    /// Replace the learned table, e.g. with one loaded from a policy store.
    pub fn with_table(mut self, table: QTable) -> Self {
        self.q_table = table;
        self
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn row_mut(&mut self, state: &str) -> &mut BTreeMap<SchedulingAction, f64> {
        self.q_table.entry(state.to_string()).or_insert_with(|| {
            SchedulingAction::ALL
                .into_iter()
                .map(|a| (a, 0.0))
                .collect()
        })
    }

    /// Best known action for a state; ties go to the earliest action.
    pub fn best_action(&self, state: &str) -> SchedulingAction {
        let Some(row) = self.q_table.get(state) else {
            return SchedulingAction::ALL[0];
        };
        best_in_row(row).0
    }

    /// Pick an action for `state`, exploring with probability epsilon.
    pub fn choose_action(&mut self, state: &str) -> SchedulingAction {
        self.row_mut(state);
        if self.rng.gen_bool(self.epsilon.clamp(0.0, 1.0)) {
            let idx = self.rng.gen_range(0..SchedulingAction::ALL.len());
            SchedulingAction::ALL[idx]
        } else {
            self.best_action(state)
        }
    }

    /// Reward for a completed decision.
    pub fn reward(&self, action: SchedulingAction, risk: RiskLevel, outcome: &Outcome) -> f64 {
        let mut reward = 0.0;

        match outcome.actual_wait_minutes {
            w if w > 120 => reward -= 10.0,
            w if w > 60 => reward -= 5.0,
            w if w > 30 => reward -= 2.0,
            _ => {}
        }

        reward += outcome.satisfaction_score * 10.0;
        reward += outcome.resource_utilization * 5.0;

        if risk == RiskLevel::Low {
            match action {
                SchedulingAction::Delay30 | SchedulingAction::Delay60
                    if outcome.satisfaction_score > 0.7 =>
                {
                    reward += 3.0;
                }
                SchedulingAction::Immediate if outcome.resource_utilization < 0.3 => {
                    reward -= 2.0;
                }
                _ => {}
            }
        }

        reward
    }

    /// Apply the Q-learning update rule, then decay epsilon.
    pub fn update(&mut self, state: &str, action: SchedulingAction, reward: f64, next_state: &str) {
        let max_next = best_in_row(self.row_mut(next_state)).1;
        let LearningConfig {
            learning_rate,
            discount_factor,
            ..
        } = self.config;

        let current = self.row_mut(state).entry(action).or_insert(0.0);
        *current += learning_rate * (reward + discount_factor * max_next - *current);

        self.epsilon = f64::max(
            self.config.min_epsilon,
            self.epsilon * self.config.epsilon_decay,
        );
    }
}

/// Highest-valued action among those present in `row`.
///
/// Rows restored from disk may hold only some actions; absent actions are
/// not assumed to be worth 0.0. An empty row yields the first action at 0.0.
fn best_in_row(row: &BTreeMap<SchedulingAction, f64>) -> (SchedulingAction, f64) {
    let mut best: Option<(SchedulingAction, f64)> = None;
    for action in SchedulingAction::ALL {
        let Some(&value) = row.get(&action) else {
            continue;
        };
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((action, value));
        }
    }
    best.unwrap_or((SchedulingAction::ALL[0], 0.0))
}
