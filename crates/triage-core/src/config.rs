use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;
use crate::scheduler::LearningConfig;

/// Default location of the persisted Q-table.
pub const DEFAULT_POLICY_PATH: &str = "q_table.json";

/// Configuration for a [`crate::desk::TriageDesk`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// Trained model artifact; `None` selects the built-in rule model.
    pub model_path: Option<PathBuf>,
    /// Q-table file; `None` disables policy persistence.
    pub policy_path: Option<PathBuf>,
    /// Persist the policy after every N feedback reports.
    pub policy_save_interval: u64,
    pub learning: LearningConfig,
    /// Fixed exploration seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            policy_path: Some(PathBuf::from(DEFAULT_POLICY_PATH)),
            policy_save_interval: 10,
            learning: LearningConfig::default(),
            seed: None,
        }
    }
}

impl DeskConfig {
    /// Read configuration from environment variables.
    ///
    /// - `TRIAGE_MODEL_PATH` (optional)
    /// - `TRIAGE_POLICY_PATH` (defaults to `q_table.json`, `off` disables)
    /// - `TRIAGE_POLICY_SAVE_INTERVAL` (defaults to 10)
    /// - `TRIAGE_LEARNING_RATE`, `TRIAGE_DISCOUNT_FACTOR`, `TRIAGE_EPSILON`,
    ///   `TRIAGE_EPSILON_DECAY` (optional)
    /// - `TRIAGE_SEED` (optional)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let model_path = lookup("TRIAGE_MODEL_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let policy_path = match lookup("TRIAGE_POLICY_PATH") {
            None => defaults.policy_path,
            Some(raw) if raw.trim().is_empty() || raw.eq_ignore_ascii_case("off") => None,
            Some(raw) => Some(PathBuf::from(raw)),
        };

        let policy_save_interval =
            parse_or(&lookup, "TRIAGE_POLICY_SAVE_INTERVAL", defaults.policy_save_interval)?;
        if policy_save_interval == 0 {
            return Err(AppError::ConfigError(
                "TRIAGE_POLICY_SAVE_INTERVAL must be at least 1".into(),
            ));
        }

        let learning = LearningConfig {
            learning_rate: parse_unit(&lookup, "TRIAGE_LEARNING_RATE", defaults.learning.learning_rate)?,
            discount_factor: parse_unit(
                &lookup,
                "TRIAGE_DISCOUNT_FACTOR",
                defaults.learning.discount_factor,
            )?,
            epsilon: parse_unit(&lookup, "TRIAGE_EPSILON", defaults.learning.epsilon)?,
            epsilon_decay: parse_unit(&lookup, "TRIAGE_EPSILON_DECAY", defaults.learning.epsilon_decay)?,
            ..defaults.learning
        };

        let seed = lookup("TRIAGE_SEED")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    AppError::ConfigError(format!("Invalid TRIAGE_SEED '{raw}': must be an integer"))
                })
            })
            .transpose()?;

        Ok(Self {
            model_path,
            policy_path,
            policy_save_interval,
            learning,
            seed,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("Invalid {key} '{raw}'"))),
    }
}

fn parse_unit(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<f64, AppError> {
    let value: f64 = parse_or(lookup, key, default)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::ConfigError(format!(
            "Invalid {key} '{value}': must be between 0 and 1"
        )))
    }
}
