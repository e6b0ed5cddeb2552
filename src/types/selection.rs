//! Sensor selection decision

use serde::{Deserialize, Serialize};

use super::SensorId;

/// Which selection rule produced the final active sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// The partner sensor carries a range or stuck fault
    OtherSensorFaulted,
    /// The partner sensor is noisy and this one has no fault
    OtherSensorNoisy,
    /// No fault or noise on either sensor
    NoFaultsDefault,
    /// Both sensors faulted; sensor 1 kept
    BothFaultedDefault,
    /// The partner sensor reads exactly zero (not installed)
    OtherSensorAbsent,
    /// The historian returned no data for the partner sensor
    OtherSensorNoData,
    /// Both selections ended up active; sensor 1 kept
    BothActiveResolved,
    /// No rule selected a sensor; sensor 1 used
    NoneActiveFallback,
}

impl SelectionReason {
    /// Short code for logging
    pub fn short_code(&self) -> &'static str {
        match self {
            SelectionReason::OtherSensorFaulted => "PEER-FAULT",
            SelectionReason::OtherSensorNoisy => "PEER-NOISE",
            SelectionReason::NoFaultsDefault => "DEFAULT",
            SelectionReason::BothFaultedDefault => "BOTH-FAULT",
            SelectionReason::OtherSensorAbsent => "PEER-ABSENT",
            SelectionReason::OtherSensorNoData => "PEER-NODATA",
            SelectionReason::BothActiveResolved => "BOTH-ACTIVE",
            SelectionReason::NoneActiveFallback => "FALLBACK",
        }
    }
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_code())
    }
}

/// The one sensor trusted for this tick.
///
/// Holding a single `SensorId` makes "both active" and "none active"
/// unrepresentable once selection has finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionDecision {
    pub active_sensor: SensorId,
    pub reason: SelectionReason,
}

impl SelectionDecision {
    pub fn is_active(&self, sensor: SensorId) -> bool {
        self.active_sensor == sensor
    }
}
