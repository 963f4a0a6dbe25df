//! Risk prediction: model artifacts, the rule-based fallback model, and the
//! helpers that turn a [`VitalSigns`] record into a scored [`RiskAssessment`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{RiskAssessment, RiskLevel};
use crate::traits::RiskModel;
use crate::vitals::{FEATURE_COUNT, VitalSigns};

/// Class distribution produced by a [`RiskModel`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Probability of the most likely class.
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .iter()
            .copied()
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Per-feature standardisation: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, AppError> {
        if features.len() != self.mean.len() {
            return Err(AppError::ModelError(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                features.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant features were fitted with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Maps class indices back to the labels the model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn transform(&self, label: &str) -> Result<usize, AppError> {
        self.classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| AppError::ModelError(format!("unknown class label: {label}")))
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, AppError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| AppError::ModelError(format!("class index {index} out of range")))
    }
}

// ---------------------------------------------------------------------------
// LinearRiskModel
// ---------------------------------------------------------------------------

/// On-disk representation of a trained multinomial logistic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub scaler: StandardScaler,
    pub classes: LabelEncoder,
    /// One row of feature weights per class.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

/// Multinomial logistic regression over standardised vital signs.
#[derive(Debug, Clone)]
pub struct LinearRiskModel {
    artifact: ModelArtifact,
}

impl LinearRiskModel {
    /// Build a model from an artifact, checking that every dimension agrees.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, AppError> {
        let n_classes = artifact.classes.classes.len();
        if n_classes < 2 {
            return Err(AppError::ModelError(
                "model artifact must declare at least two classes".into(),
            ));
        }
        if artifact.scaler.mean.len() != FEATURE_COUNT
            || artifact.scaler.scale.len() != FEATURE_COUNT
        {
            return Err(AppError::ModelError(format!(
                "scaler must have {FEATURE_COUNT} entries (mean: {}, scale: {})",
                artifact.scaler.mean.len(),
                artifact.scaler.scale.len()
            )));
        }
        if artifact.coefficients.len() != n_classes || artifact.intercepts.len() != n_classes {
            return Err(AppError::ModelError(format!(
                "expected {n_classes} coefficient rows and intercepts, got {} and {}",
                artifact.coefficients.len(),
                artifact.intercepts.len()
            )));
        }
        if let Some(row) = artifact
            .coefficients
            .iter()
            .find(|row| row.len() != FEATURE_COUNT)
        {
            return Err(AppError::ModelError(format!(
                "coefficient rows must have {FEATURE_COUNT} weights, got {}",
                row.len()
            )));
        }
        for class in &artifact.classes.classes {
            class.parse::<RiskLevel>().map_err(AppError::ModelError)?;
        }
        Ok(Self { artifact })
    }

    /// Load a JSON model artifact from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ModelError(format!("failed to read model {}: {e}", path.display()))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        let model = Self::from_artifact(artifact)?;
        tracing::info!(path = %path.display(), model = %model.name(), "Loaded risk model");
        Ok(model)
    }
}

impl RiskModel for LinearRiskModel {
    fn name(&self) -> &str {
        &self.artifact.name
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, AppError> {
        let scaled = self.artifact.scaler.transform(features)?;

        let logits: Vec<f64> = self
            .artifact
            .coefficients
            .iter()
            .zip(&self.artifact.intercepts)
            .map(|(row, intercept)| {
                row.iter().zip(&scaled).map(|(w, x)| w * x).sum::<f64>() + intercept
            })
            .collect();

        let probabilities = softmax(&logits);
        let best = argmax(&probabilities)
            .ok_or_else(|| AppError::ModelError("model produced no scores".into()))?;
        let label = self.artifact.classes.inverse_transform(best)?.to_string();

        Ok(Prediction {
            label,
            probabilities,
        })
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// VitalsRuleModel
// ---------------------------------------------------------------------------

/// Early-warning score model used when no trained artifact is configured.
///
/// Each vital scores 0–3 points against normal bands; the total maps to a
/// risk class. A single reading scoring 3 raises a low total to medium.
/// Confidence grows with the distance of the total from the nearest class
/// boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct VitalsRuleModel;

impl VitalsRuleModel {
    const MEDIUM_THRESHOLD: u32 = 5;
    const HIGH_THRESHOLD: u32 = 7;

    /// Per-vital warning points, in the order: respiratory rate, oxygen
    /// saturation, systolic pressure, heart rate, temperature.
    fn points(features: &[f64]) -> [u32; 5] {
        let heart_rate = features[0];
        let respiratory_rate = features[1];
        let temperature = if features[2] > 45.0 {
            (features[2] - 32.0) * 5.0 / 9.0
        } else {
            features[2]
        };
        let spo2 = features[3];
        let systolic = features[4];

        let rr = match respiratory_rate {
            r if r <= 8.0 => 3,
            r if r <= 11.0 => 1,
            r if r <= 20.0 => 0,
            r if r <= 24.0 => 2,
            _ => 3,
        };
        let sat = match spo2 {
            s if s <= 91.0 => 3,
            s if s <= 93.0 => 2,
            s if s <= 95.0 => 1,
            _ => 0,
        };
        let sys = match systolic {
            s if s <= 90.0 => 3,
            s if s <= 100.0 => 2,
            s if s <= 110.0 => 1,
            s if s < 220.0 => 0,
            _ => 3,
        };
        let hr = match heart_rate {
            h if h <= 40.0 => 3,
            h if h <= 50.0 => 1,
            h if h <= 90.0 => 0,
            h if h <= 110.0 => 1,
            h if h <= 130.0 => 2,
            _ => 3,
        };
        let temp = match temperature {
            t if t <= 35.0 => 3,
            t if t <= 36.0 => 1,
            t if t <= 38.0 => 0,
            t if t <= 39.0 => 1,
            _ => 2,
        };
        [rr, sat, sys, hr, temp]
    }

    /// Classify a feature vector, returning the class and its margin from
    /// the nearest boundary in points.
    fn classify(features: &[f64]) -> (RiskLevel, u32) {
        let points = Self::points(features);
        let total: u32 = points.iter().sum();
        let red_flag = points.contains(&3);

        if total >= Self::HIGH_THRESHOLD {
            (RiskLevel::High, total - (Self::HIGH_THRESHOLD - 1))
        } else if total >= Self::MEDIUM_THRESHOLD {
            let margin = (total - (Self::MEDIUM_THRESHOLD - 1)).min(Self::HIGH_THRESHOLD - total);
            (RiskLevel::Medium, margin)
        } else if red_flag {
            (RiskLevel::Medium, 1)
        } else {
            (RiskLevel::Low, Self::MEDIUM_THRESHOLD - total)
        }
    }
}

impl RiskModel for VitalsRuleModel {
    fn name(&self) -> &str {
        "vitals-rules"
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, AppError> {
        if features.len() != FEATURE_COUNT {
            return Err(AppError::ModelError(format!(
                "expected {FEATURE_COUNT} features, got {}",
                features.len()
            )));
        }

        let (level, margin) = Self::classify(features);
        let confidence = f64::min(0.55 + 0.1 * f64::from(margin), 0.95);
        let rest = (1.0 - confidence) / (RiskLevel::ALL.len() - 1) as f64;
        let probabilities = RiskLevel::ALL
            .iter()
            .map(|l| if *l == level { confidence } else { rest })
            .collect();

        Ok(Prediction {
            label: level.as_str().to_string(),
            probabilities,
        })
    }
}

// ---------------------------------------------------------------------------
// Assessment helpers
// ---------------------------------------------------------------------------

/// Predict the risk level and confidence score for a vital-signs record.
pub fn predict_risk_with_confidence(
    model: &dyn RiskModel,
    vitals: &VitalSigns,
) -> Result<(RiskLevel, f64), AppError> {
    let prediction = model.predict(&vitals.features())?;
    let level = prediction
        .label
        .parse::<RiskLevel>()
        .map_err(AppError::ModelError)?;
    Ok((level, prediction.confidence()))
}

/// Validate, predict and score a new patient as of `now`.
pub fn assess(
    model: &dyn RiskModel,
    vitals: VitalSigns,
    now: DateTime<Utc>,
) -> Result<RiskAssessment, AppError> {
    vitals.validate()?;
    let (level, confidence) = predict_risk_with_confidence(model, &vitals)?;

    let mut assessment = RiskAssessment::new(level, vitals, confidence, now);
    assessment.calculate_priority_score(now);

    tracing::debug!(
        model = %model.name(),
        risk_level = %level,
        confidence,
        priority = assessment.priority_score,
        "Assessed patient"
    );

    Ok(assessment)
}
