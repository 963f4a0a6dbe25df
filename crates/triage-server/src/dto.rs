use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use triage_core::error::AppError;
use triage_core::queue::QueueEntry;
use triage_core::scheduler::Outcome;
use triage_core::vitals::VitalSigns;
use triage_core::{PolicyStats, PriorityCounts};

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Intake vital signs, using the field names of the bedside export format.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PredictRequest {
    /// Beats per minute
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    /// Breaths per minute
    #[serde(rename = "Respiratory_Rate")]
    pub respiratory_rate: f64,
    /// Celsius, or Fahrenheit for readings above 45
    #[serde(rename = "Body_Temperature")]
    pub body_temperature: f64,
    /// Percent
    #[serde(rename = "Oxygen_Saturation")]
    pub oxygen_saturation: f64,
    #[serde(rename = "Systolic_Blood_Pressure")]
    pub systolic_blood_pressure: f64,
    #[serde(rename = "Diastolic_Blood_Pressure")]
    pub diastolic_blood_pressure: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    /// 0 for female, 1 for male
    #[serde(rename = "Gender")]
    pub gender: u8,
    #[serde(rename = "Weight_kg")]
    pub weight_kg: f64,
    #[serde(rename = "Height_m")]
    pub height_m: f64,
    #[serde(rename = "Derived_HRV")]
    pub derived_hrv: f64,
    #[serde(rename = "Derived_Pulse_Pressure")]
    pub derived_pulse_pressure: f64,
    #[serde(rename = "Derived_BMI")]
    pub derived_bmi: f64,
    #[serde(rename = "Derived_MAP")]
    pub derived_map: f64,
}

impl PredictRequest {
    /// Convert to the core record, truncating whole-number readings.
    pub fn into_vitals(self) -> Result<VitalSigns, AppError> {
        Ok(VitalSigns {
            heart_rate: whole("Heart_Rate", self.heart_rate)?,
            respiratory_rate: whole("Respiratory_Rate", self.respiratory_rate)?,
            body_temperature: self.body_temperature,
            oxygen_saturation: whole("Oxygen_Saturation", self.oxygen_saturation)?,
            systolic_blood_pressure: whole(
                "Systolic_Blood_Pressure",
                self.systolic_blood_pressure,
            )?,
            diastolic_blood_pressure: whole(
                "Diastolic_Blood_Pressure",
                self.diastolic_blood_pressure,
            )?,
            age: whole("Age", self.age)?,
            gender: self.gender,
            weight: self.weight_kg,
            height: self.height_m,
            derived_hrv: self.derived_hrv,
            derived_pulse_pressure: self.derived_pulse_pressure,
            derived_bmi: self.derived_bmi,
            derived_map: self.derived_map,
        })
    }
}

fn whole(field: &str, value: f64) -> Result<u32, AppError> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(AppError::ValidationError(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(value.trunc() as u32)
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VitalSignsResponse {
    pub heart_rate: u32,
    pub respiratory_rate: u32,
    pub body_temperature: f64,
    pub oxygen_saturation: u32,
    pub systolic_blood_pressure: u32,
    pub diastolic_blood_pressure: u32,
    pub age: u32,
    pub gender: u8,
    pub weight: f64,
    pub height: f64,
    pub derived_hrv: f64,
    pub derived_pulse_pressure: f64,
    pub derived_bmi: f64,
    pub derived_map: f64,
}

impl From<VitalSigns> for VitalSignsResponse {
    fn from(v: VitalSigns) -> Self {
        Self {
            heart_rate: v.heart_rate,
            respiratory_rate: v.respiratory_rate,
            body_temperature: v.body_temperature,
            oxygen_saturation: v.oxygen_saturation,
            systolic_blood_pressure: v.systolic_blood_pressure,
            diastolic_blood_pressure: v.diastolic_blood_pressure,
            age: v.age,
            gender: v.gender,
            weight: v.weight,
            height: v.height,
            derived_hrv: v.derived_hrv,
            derived_pulse_pressure: v.derived_pulse_pressure,
            derived_bmi: v.derived_bmi,
            derived_map: v.derived_map,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RiskPredictionResponse {
    pub patient_id: String,
    pub risk_level: String,
    pub confidence_score: f64,
    pub priority_score: f64,
    pub queue_position: usize,
    /// Minutes
    pub estimated_wait_time: u32,
    pub timestamp: DateTime<Utc>,
    pub details: VitalSignsResponse,
}

impl From<QueueEntry> for RiskPredictionResponse {
    fn from(entry: QueueEntry) -> Self {
        Self {
            priority_score: entry.final_priority(),
            patient_id: entry.patient_id,
            risk_level: entry.assessment.risk_level.to_string(),
            confidence_score: entry.assessment.confidence_score,
            queue_position: entry.queue_position,
            estimated_wait_time: entry.estimated_wait_minutes,
            timestamp: entry.assessment.assessed_at,
            details: entry.assessment.vital_signs.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PatientQueueResponse {
    pub patient_id: String,
    pub risk_level: String,
    pub confidence_score: f64,
    pub priority_score: f64,
    pub queue_position: usize,
    /// Minutes
    pub estimated_wait_time: u32,
    pub timestamp: DateTime<Utc>,
    /// Scheduling action applied to low-risk patients
    pub scheduling_action: Option<String>,
}

impl From<QueueEntry> for PatientQueueResponse {
    fn from(entry: QueueEntry) -> Self {
        Self {
            priority_score: entry.final_priority(),
            patient_id: entry.patient_id,
            risk_level: entry.assessment.risk_level.to_string(),
            confidence_score: entry.assessment.confidence_score,
            queue_position: entry.queue_position,
            estimated_wait_time: entry.estimated_wait_minutes,
            timestamp: entry.assessment.assessed_at,
            scheduling_action: entry.rl_action.map(|a| a.to_string()),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UpdatePrioritiesResponse {
    pub message: String,
    pub high_priority_count: usize,
    pub medium_priority_count: usize,
    pub low_priority_count: usize,
}

impl From<PriorityCounts> for UpdatePrioritiesResponse {
    fn from(counts: PriorityCounts) -> Self {
        let message = if counts.total == 0 {
            "No patients in queue".to_string()
        } else {
            format!("Updated priorities for {} patients", counts.total)
        };
        Self {
            message,
            high_priority_count: counts.high,
            medium_priority_count: counts.medium,
            low_priority_count: counts.low,
        }
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct FeedbackQuery {
    /// Patient identifier returned by `/predict`
    pub patient_id: String,
    /// Actual wait time in minutes
    pub actual_wait_time: u32,
    /// Patient satisfaction (0.0 to 1.0)
    pub satisfaction_score: f64,
    /// Resource utilization efficiency (0.0 to 1.0, default 0.5)
    pub resource_utilization: Option<f64>,
}

impl FeedbackQuery {
    pub fn outcome(&self, recorded_at: DateTime<Utc>) -> Outcome {
        Outcome {
            actual_wait_minutes: self.actual_wait_time,
            satisfaction_score: self.satisfaction_score,
            resource_utilization: self.resource_utilization.unwrap_or(0.5),
            recorded_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OutcomeResponse {
    pub actual_wait_time: u32,
    pub satisfaction_score: f64,
    pub resource_utilization: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<Outcome> for OutcomeResponse {
    fn from(o: Outcome) -> Self {
        Self {
            actual_wait_time: o.actual_wait_minutes,
            satisfaction_score: o.satisfaction_score,
            resource_utilization: o.resource_utilization,
            timestamp: o.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FeedbackResponse {
    pub message: String,
    pub patient_id: String,
    pub outcome: OutcomeResponse,
    /// Whether the scheduling policy was updated
    pub learned: bool,
    pub reward: Option<f64>,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PolicyResponse {
    pub epsilon: f64,
    pub states: usize,
    pub feedback_received: u64,
    pub pending_decisions: usize,
}

impl From<PolicyStats> for PolicyResponse {
    fn from(s: PolicyStats) -> Self {
        Self {
            epsilon: s.epsilon,
            states: s.states,
            feedback_received: s.feedback_received,
            pending_decisions: s.pending_decisions,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub queue_length: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
