//! Per-tank evaluation output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FaultReport, SelectionDecision, SensorId, SensorReading};

/// Fill-rate check on the active sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FillRateStatus {
    pub sensor: SensorId,
    /// Current average minus the hour-ago average
    pub rate: f64,
    pub max_fill_rate: f64,
    pub warning: bool,
}

/// Complete result of one successful tank evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankReport {
    pub tank: String,
    pub evaluated_at: DateTime<Utc>,
    pub sensor1: SensorReading,
    pub sensor2: SensorReading,
    /// Absent when one sensor had no data and classification was skipped
    pub faults: Option<FaultReport>,
    pub selection: SelectionDecision,
    pub fill_rate: FillRateStatus,
}

impl TankReport {
    pub fn active_sensor(&self) -> SensorId {
        self.selection.active_sensor
    }

    pub fn fill_rate_warning(&self) -> bool {
        self.fill_rate.warning
    }
}

/// What a tank evaluation delivers to the alarm sinks each tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TankOutcome {
    Evaluated(TankReport),
    /// No selection was made for this tank this tick
    Failed {
        tank: String,
        evaluated_at: DateTime<Utc>,
        error: String,
    },
}

impl TankOutcome {
    pub fn tank(&self) -> &str {
        match self {
            TankOutcome::Evaluated(report) => &report.tank,
            TankOutcome::Failed { tank, .. } => tank,
        }
    }

    pub fn report(&self) -> Option<&TankReport> {
        match self {
            TankOutcome::Evaluated(report) => Some(report),
            TankOutcome::Failed { .. } => None,
        }
    }

    /// The boolean consumed by the external alarm collaborator.
    /// A failed evaluation raises no fill-rate warning.
    pub fn fill_rate_warning(&self) -> bool {
        self.report().is_some_and(TankReport::fill_rate_warning)
    }
}
