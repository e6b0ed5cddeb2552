//! Rule engine: fault classification, sensor selection, fill-rate check
//!
//! Everything here is a pure function of one tick's samples and the tank's
//! configuration. Re-running with identical inputs gives identical output.
//!
//! ## Flow
//!
//! ```text
//! SensorReading x2 -> fault_classifier -> sensor_selector -> fill_rate -> Evaluation
//! ```

pub mod fault_classifier;
pub mod fill_rate;
pub mod sensor_selector;

pub use fault_classifier::classify;
pub use fill_rate::check_fill_rate;
pub use sensor_selector::{select, select_sole_reporting};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RuleThresholds;
use crate::types::{FaultReport, FillRateStatus, SelectionDecision, SensorId, SensorReading};

/// Why a tank produced no selection this tick
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Max_Fill_Rate missing or unusable; fatal for this tank's evaluation
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no historian data for either sensor ({sensor1}: {sensor1_reason}; {sensor2}: {sensor2_reason})")]
    NoData {
        sensor1: String,
        sensor1_reason: String,
        sensor2: String,
        sensor2_reason: String,
    },
}

/// A validated, strictly positive Max_Fill_Rate (percent of span per hour)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MaxFillRate(f64);

impl MaxFillRate {
    pub fn new(value: Option<f64>) -> Result<Self, EvaluationError> {
        match value {
            None => Err(EvaluationError::Configuration(
                "max_fill_rate is not configured".to_string(),
            )),
            Some(v) if !v.is_finite() || v <= 0.0 => Err(EvaluationError::Configuration(format!(
                "max_fill_rate must be a positive finite number, got {v}"
            ))),
            Some(v) => Ok(Self(v)),
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Rule engine output for one tank at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `None` when a sensor had no data and classification could not run
    pub faults: Option<FaultReport>,
    pub selection: SelectionDecision,
    pub fill_rate: FillRateStatus,
}

/// Run the full rule chain on one tick's readings.
///
/// With both sensors reporting, the classifier and selector run normally.
/// With one sensor missing, the reporting sensor is selected and the
/// cross-sensor rules are skipped. With both missing, no selection is made.
pub fn evaluate(
    sensor1: &SensorReading,
    sensor2: &SensorReading,
    max_fill_rate: MaxFillRate,
    rules: &RuleThresholds,
) -> Result<Evaluation, EvaluationError> {
    match (sensor1, sensor2) {
        (SensorReading::Available(s1), SensorReading::Available(s2)) => {
            let faults = classify(s1, s2, max_fill_rate, rules);
            let selection = select(s1, s2, &faults);
            let active = if selection.is_active(SensorId::Sensor1) { s1 } else { s2 };
            let fill_rate = check_fill_rate(selection.active_sensor, active, max_fill_rate);
            Ok(Evaluation {
                faults: Some(faults),
                selection,
                fill_rate,
            })
        }
        (SensorReading::Available(sample), SensorReading::NoData { .. })
        | (SensorReading::NoData { .. }, SensorReading::Available(sample)) => {
            let available = if sensor1.is_available() {
                SensorId::Sensor1
            } else {
                SensorId::Sensor2
            };
            Ok(Evaluation {
                faults: None,
                selection: select_sole_reporting(available),
                fill_rate: check_fill_rate(available, sample, max_fill_rate),
            })
        }
        (
            SensorReading::NoData { tag: tag1, reason: reason1 },
            SensorReading::NoData { tag: tag2, reason: reason2 },
        ) => Err(EvaluationError::NoData {
            sensor1: tag1.clone(),
            sensor1_reason: reason1.clone(),
            sensor2: tag2.clone(),
            sensor2_reason: reason2.clone(),
        }),
    }
}
