use std::sync::Arc;

use axum::Router;

use triage_core::{LearningConfig, NullPolicyStore, QLearningScheduler, TriageDesk, VitalsRuleModel};
use triage_server::routes;
use triage_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

/// The served application over an in-memory desk with a greedy, seeded scheduler so that
/// scheduling decisions are reproducible.
pub fn setup_test_app() -> Router {
    build_app(None)
}

/// Same as [`setup_test_app`] but with bearer auth enabled.
pub fn setup_test_app_with_auth() -> Router {
    build_app(Some(TEST_API_KEY.to_string()))
}

fn build_app(api_key: Option<String>) -> Router {
    let config = LearningConfig {
        epsilon: 0.0,
        min_epsilon: 0.0,
        ..LearningConfig::default()
    };
    let desk = TriageDesk::new(
        Box::new(VitalsRuleModel),
        Box::new(NullPolicyStore),
        QLearningScheduler::with_seed(config, 7),
    );

    let state = Arc::new(AppState { desk, api_key });
    routes::app(state)
}

pub fn normal_vitals() -> serde_json::Value {
    serde_json::json!({
        "Heart_Rate": 72,
        "Respiratory_Rate": 16,
        "Body_Temperature": 36.8,
        "Oxygen_Saturation": 98,
        "Systolic_Blood_Pressure": 120,
        "Diastolic_Blood_Pressure": 80,
        "Age": 45,
        "Gender": 1,
        "Weight_kg": 70.0,
        "Height_m": 1.75,
        "Derived_HRV": 45.0,
        "Derived_Pulse_Pressure": 40,
        "Derived_BMI": 22.9,
        "Derived_MAP": 93.3
    })
}

pub fn critical_vitals() -> serde_json::Value {
    serde_json::json!({
        "Heart_Rate": 130,
        "Respiratory_Rate": 30,
        "Body_Temperature": 40.0,
        "Oxygen_Saturation": 85,
        "Systolic_Blood_Pressure": 85,
        "Diastolic_Blood_Pressure": 45,
        "Age": 65,
        "Gender": 0,
        "Weight_kg": 55.0,
        "Height_m": 1.60,
        "Derived_HRV": 15.0,
        "Derived_Pulse_Pressure": 40,
        "Derived_BMI": 21.5,
        "Derived_MAP": 58.3
    })
}
