use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vitals::VitalSigns;

/// Predicted risk category of a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Base weight of the priority score.
    pub fn base_weight(&self) -> f64 {
        match self {
            RiskLevel::Low => 10.0,
            RiskLevel::Medium => 50.0,
            RiskLevel::High => 100.0,
        }
    }

    /// Minutes after which time urgency has grown by one full unit.
    pub fn urgency_period_minutes(&self) -> f64 {
        match self {
            RiskLevel::Low => 120.0,
            RiskLevel::Medium => 30.0,
            RiskLevel::High => 10.0,
        }
    }

    /// Expected treatment time consumed by each queue slot ahead of a patient.
    pub fn minutes_per_slot(&self) -> u32 {
        match self {
            RiskLevel::Low => 25,
            RiskLevel::Medium => 20,
            RiskLevel::High => 15,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    /// Accepts model labels such as `"high"`, `"High Risk"` or `"MEDIUM_RISK"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        let head = normalized
            .strip_suffix(" risk")
            .unwrap_or(&normalized)
            .trim();
        match head {
            "low" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("Unknown risk level: {s}")),
        }
    }
}

/// A scored risk prediction for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub vital_signs: VitalSigns,
    /// Probability of the predicted class, in `[0.0, 1.0]`.
    pub confidence_score: f64,
    pub priority_score: f64,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn new(
        risk_level: RiskLevel,
        vital_signs: VitalSigns,
        confidence_score: f64,
        assessed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            risk_level,
            vital_signs,
            confidence_score,
            priority_score: 0.0,
            assessed_at,
        }
    }

    /// Urgency multiplier that grows linearly with time spent waiting.
    pub fn time_urgency(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_minutes = (now - self.assessed_at).num_milliseconds().max(0) as f64 / 60_000.0;
        1.0 + elapsed_minutes / self.risk_level.urgency_period_minutes()
    }

    /// Elderly patients get up to 1.5 extra weight.
    pub fn age_factor(&self) -> f64 {
        f64::min(f64::from(self.vital_signs.age) / 80.0, 1.5)
    }

    /// Recompute and store the priority score as of `now`.
    pub fn calculate_priority_score(&mut self, now: DateTime<Utc>) -> f64 {
        let priority = self.risk_level.base_weight()
            * self.confidence_score
            * self.time_urgency(now)
            * (1.0 + self.age_factor())
            * (1.0 + self.vital_signs.critical_factor());
        self.priority_score = priority;
        priority
    }
}
