use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{RiskAssessment, RiskLevel};
use crate::scheduler::{QLearningScheduler, QueueSnapshot, SchedulingAction, state_key};

/// A patient waiting to be seen.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub assessment: RiskAssessment,
}

/// A patient's place in the ranked queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub patient_id: String,
    pub assessment: RiskAssessment,
    /// 1-based position in the ranked queue
    pub queue_position: usize,
    pub estimated_wait_minutes: u32,
    /// Priority adjustment chosen by the scheduler (low-risk only)
    pub rl_adjustment: f64,
    pub rl_state: Option<String>,
    pub rl_action: Option<SchedulingAction>,
}

impl QueueEntry {
    fn unranked(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.patient_id.clone(),
            assessment: record.assessment.clone(),
            queue_position: 0,
            estimated_wait_minutes: 0,
            rl_adjustment: 0.0,
            rl_state: None,
            rl_action: None,
        }
    }

    /// Priority score including the scheduler's adjustment.
    pub fn final_priority(&self) -> f64 {
        if self.assessment.risk_level == RiskLevel::Low {
            self.assessment.priority_score + self.rl_adjustment
        } else {
            self.assessment.priority_score
        }
    }
}

/// Per-level counts of the current queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn from_entries(entries: &[QueueEntry]) -> Self {
        let mut counts = PriorityCounts {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.assessment.risk_level {
                RiskLevel::High => counts.high += 1,
                RiskLevel::Medium => counts.medium += 1,
                RiskLevel::Low => counts.low += 1,
            }
        }
        counts
    }
}

/// Estimated wait for a patient at a 0-based queue index.
pub fn estimate_wait(risk: RiskLevel, index: usize) -> u32 {
    let index = u32::try_from(index).unwrap_or(u32::MAX);
    let wait = index.saturating_mul(risk.minutes_per_slot());
    match risk {
        RiskLevel::High => wait.saturating_sub(10),
        _ => wait,
    }
}

/// Recompute priorities, consult the scheduler for low-risk patients and
/// return the queue ordered by final priority, highest first.
///
/// Records keep their refreshed priority scores. Patients with equal final
/// priority keep their admission order.
pub fn rank(
    records: &mut [PatientRecord],
    scheduler: &mut QLearningScheduler,
    now: DateTime<Utc>,
) -> Vec<QueueEntry> {
    let snapshot = QueueSnapshot::from_assessments(
        records
            .iter()
            .map(|r| (r.assessment.risk_level, r.assessment.confidence_score)),
    );

    let mut entries: Vec<QueueEntry> = records
        .iter_mut()
        .map(|record| {
            record.assessment.calculate_priority_score(now);
            let mut entry = QueueEntry::unranked(record);

            if entry.assessment.risk_level == RiskLevel::Low {
                let state = state_key(
                    RiskLevel::Low,
                    entry.assessment.confidence_score,
                    &snapshot,
                    now,
                );
                let action = scheduler.choose_action(&state);
                entry.rl_adjustment = action.priority_boost();
                entry.rl_state = Some(state);
                entry.rl_action = Some(action);
            }
            entry
        })
        .collect();

    entries.sort_by(|a, b| b.final_priority().total_cmp(&a.final_priority()));

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.queue_position = i + 1;
        let delay = entry.rl_action.map_or(0, |a| a.delay_minutes());
        entry.estimated_wait_minutes =
            estimate_wait(entry.assessment.risk_level, i).saturating_add(delay);
    }

    entries
}
