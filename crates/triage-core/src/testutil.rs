//! Test utilities: fixtures and mock implementations of the core traits.
//!
//! Mocks use `Arc<Mutex<_>>` for interior mutability so tests can assert on
//! recorded calls after handing a clone to the code under test.

use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::predictor::Prediction;
use crate::scheduler::QTable;
use crate::traits::{PolicyStore, RiskModel};
use crate::vitals::VitalSigns;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A healthy adult with every reading inside normal bands.
pub fn normal_vitals() -> VitalSigns {
    VitalSigns {
        heart_rate: 72,
        respiratory_rate: 16,
        body_temperature: 36.8,
        oxygen_saturation: 98,
        systolic_blood_pressure: 120,
        diastolic_blood_pressure: 80,
        age: 45,
        gender: 1,
        weight: 70.0,
        height: 1.75,
        derived_hrv: 45.0,
        derived_pulse_pressure: 40.0,
        derived_bmi: 22.9,
        derived_map: 93.3,
    }
}

/// An elderly patient in shock with hypoxia and fever.
pub fn critical_vitals() -> VitalSigns {
    VitalSigns {
        heart_rate: 130,
        respiratory_rate: 30,
        body_temperature: 40.0,
        oxygen_saturation: 85,
        systolic_blood_pressure: 85,
        diastolic_blood_pressure: 45,
        age: 65,
        gender: 0,
        weight: 55.0,
        height: 1.60,
        derived_hrv: 15.0,
        derived_pulse_pressure: 40.0,
        derived_bmi: 21.5,
        derived_map: 58.3,
    }
}

// ---------------------------------------------------------------------------
// FixedModel
// ---------------------------------------------------------------------------

/// Mock model that returns the same prediction for every input.
#[derive(Clone)]
pub struct FixedModel {
    prediction: Prediction,
}

impl FixedModel {
    pub fn new(label: &str, probabilities: Vec<f64>) -> Self {
        Self {
            prediction: Prediction {
                label: label.to_string(),
                probabilities,
            },
        }
    }
}

impl RiskModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn predict(&self, _features: &[f64]) -> Result<Prediction, AppError> {
        Ok(self.prediction.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryPolicyStore
// ---------------------------------------------------------------------------

/// In-memory policy store that records every save.
#[derive(Clone, Default)]
pub struct MemoryPolicyStore {
    table: Arc<Mutex<Option<QTable>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryPolicyStore {
    pub fn table(&self) -> Option<QTable> {
        self.table.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load(&self) -> Result<Option<QTable>, AppError> {
        Ok(self.table())
    }

    fn save(&self, table: &QTable) -> Result<(), AppError> {
        *self.table.lock().unwrap() = Some(table.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
