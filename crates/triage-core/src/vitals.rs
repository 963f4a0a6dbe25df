use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of model input features derived from a [`VitalSigns`] record.
pub const FEATURE_COUNT: usize = 14;

/// Feature names in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "heart_rate",
    "respiratory_rate",
    "body_temperature",
    "oxygen_saturation",
    "systolic_blood_pressure",
    "diastolic_blood_pressure",
    "age",
    "gender",
    "weight",
    "height",
    "derived_hrv",
    "derived_pulse_pressure",
    "derived_bmi",
    "derived_map",
];

/// Readings above this are taken to be Fahrenheit.
const FAHRENHEIT_THRESHOLD: f64 = 45.0;

/// A single patient's vital signs at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate: u32,
    pub respiratory_rate: u32,
    pub body_temperature: f64,
    pub oxygen_saturation: u32,
    pub systolic_blood_pressure: u32,
    pub diastolic_blood_pressure: u32,
    pub age: u32,
    /// 0 for female, 1 for male
    pub gender: u8,
    /// Kilograms
    pub weight: f64,
    /// Metres
    pub height: f64,
    pub derived_hrv: f64,
    pub derived_pulse_pressure: f64,
    pub derived_bmi: f64,
    pub derived_map: f64,
}

impl VitalSigns {
    /// Check every reading against physiologically plausible bounds.
    pub fn validate(&self) -> Result<(), AppError> {
        check_int("heart_rate", self.heart_rate, 1, 300)?;
        check_int("respiratory_rate", self.respiratory_rate, 1, 80)?;
        check_float("body_temperature", self.body_temperature, 25.0, 115.0)?;
        check_int("oxygen_saturation", self.oxygen_saturation, 1, 100)?;
        check_int(
            "systolic_blood_pressure",
            self.systolic_blood_pressure,
            30,
            300,
        )?;
        check_int(
            "diastolic_blood_pressure",
            self.diastolic_blood_pressure,
            10,
            250,
        )?;
        if self.diastolic_blood_pressure > self.systolic_blood_pressure {
            return Err(AppError::ValidationError(format!(
                "diastolic_blood_pressure ({}) exceeds systolic_blood_pressure ({})",
                self.diastolic_blood_pressure, self.systolic_blood_pressure
            )));
        }
        check_int("age", self.age, 0, 130)?;
        if self.gender > 1 {
            return Err(AppError::ValidationError(format!(
                "gender must be 0 (female) or 1 (male), got {}",
                self.gender
            )));
        }
        check_positive("weight", self.weight, 500.0)?;
        check_positive("height", self.height, 3.0)?;
        check_non_negative("derived_hrv", self.derived_hrv)?;
        check_finite("derived_pulse_pressure", self.derived_pulse_pressure)?;
        check_non_negative("derived_bmi", self.derived_bmi)?;
        check_non_negative("derived_map", self.derived_map)?;
        Ok(())
    }

    /// Model input vector, ordered as [`FEATURE_NAMES`].
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.heart_rate),
            f64::from(self.respiratory_rate),
            self.body_temperature,
            f64::from(self.oxygen_saturation),
            f64::from(self.systolic_blood_pressure),
            f64::from(self.diastolic_blood_pressure),
            f64::from(self.age),
            f64::from(self.gender),
            self.weight,
            self.height,
            self.derived_hrv,
            self.derived_pulse_pressure,
            self.derived_bmi,
            self.derived_map,
        ]
    }

    /// Body temperature in Celsius, converting Fahrenheit readings.
    pub fn body_temperature_celsius(&self) -> f64 {
        if self.body_temperature > FAHRENHEIT_THRESHOLD {
            (self.body_temperature - 32.0) * 5.0 / 9.0
        } else {
            self.body_temperature
        }
    }

    /// Extra urgency contributed by critical readings, in `[0.0, 1.0]`.
    pub fn critical_factor(&self) -> f64 {
        let mut factor = 0.0;

        // Bradycardia / tachycardia
        if self.heart_rate < 50 || self.heart_rate > 120 {
            factor += 0.3;
        }
        // Hypotension / hypertensive crisis
        if self.systolic_blood_pressure < 90 || self.systolic_blood_pressure > 180 {
            factor += 0.4;
        }
        if self.oxygen_saturation < 90 {
            factor += 0.5;
        }
        let celsius = self.body_temperature_celsius();
        if !(35.0..=39.0).contains(&celsius) {
            factor += 0.3;
        }
        if self.respiratory_rate < 12 || self.respiratory_rate > 25 {
            factor += 0.2;
        }

        f64::min(factor, 1.0)
    }
}

fn check_int(field: &str, value: u32, min: u32, max: u32) -> Result<(), AppError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{field} must be between {min} and {max}, got {value}"
        )))
    }
}

fn check_float(field: &str, value: f64, min: f64, max: f64) -> Result<(), AppError> {
    check_finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{field} must be between {min} and {max}, got {value}"
        )))
    }
}

fn check_positive(field: &str, value: f64, max: f64) -> Result<(), AppError> {
    check_finite(field, value)?;
    if value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{field} must be greater than 0 and at most {max}, got {value}"
        )))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), AppError> {
    check_finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{field} must not be negative, got {value}"
        )))
    }
}

fn check_finite(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{field} must be a finite number"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{critical_vitals, normal_vitals};

    #[test]
    fn test_normal_vitals_validate() {
        assert!(normal_vitals().validate().is_ok());
        assert!(critical_vitals().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_fields_rejected() {
        let mut v = normal_vitals();
        v.heart_rate = 0;
        let err = v.validate().unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m.contains("heart_rate")));

        let mut v = normal_vitals();
        v.oxygen_saturation = 101;
        assert!(v.validate().is_err());

        let mut v = normal_vitals();
        v.gender = 2;
        assert!(v.validate().is_err());

        let mut v = normal_vitals();
        v.height = 0.0;
        assert!(v.validate().is_err());

        let mut v = normal_vitals();
        v.derived_bmi = f64::NAN;
        assert!(v.validate().is_err());
    }

    #[test]
    fn test_diastolic_above_systolic_rejected() {
        let mut v = normal_vitals();
        v.systolic_blood_pressure = 80;
        v.diastolic_blood_pressure = 90;
        let err = v.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_features_follow_declared_order() {
        let v = normal_vitals();
        let f = v.features();
        assert_eq!(f.len(), FEATURE_NAMES.len());
        assert_eq!(f[0], f64::from(v.heart_rate));
        assert_eq!(f[7], f64::from(v.gender));
        assert_eq!(f[13], v.derived_map);
    }

    #[test]
    fn test_fahrenheit_readings_are_converted() {
        let mut v = normal_vitals();
        v.body_temperature = 98.6;
        assert!((v.body_temperature_celsius() - 37.0).abs() < 1e-9);

        v.body_temperature = 36.6;
        assert_eq!(v.body_temperature_celsius(), 36.6);
    }

    #[test]
    fn test_normal_vitals_have_no_critical_factor() {
        assert_eq!(normal_vitals().critical_factor(), 0.0);

        // 98.6°F is normal once converted
        let mut v = normal_vitals();
        v.body_temperature = 98.6;
        assert_eq!(v.critical_factor(), 0.0);
    }

    #[test]
    fn test_critical_factor_accumulates_and_caps() {
        let mut v = normal_vitals();
        v.heart_rate = 130;
        assert!((v.critical_factor() - 0.3).abs() < 1e-9);

        v.oxygen_saturation = 85;
        assert!((v.critical_factor() - 0.8).abs() < 1e-9);

        assert_eq!(critical_vitals().critical_factor(), 1.0);
    }
}
