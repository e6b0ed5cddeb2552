//! Fault classification results

use serde::{Deserialize, Serialize};

use super::SensorId;

/// Which disagreement-gated rule marked a sensor as suspect.
///
/// Provenance marker only: later rules replace earlier ones for the same
/// sensor, and variants are never ranked against each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FaultReason {
    #[default]
    None,
    /// Current average outside the plausible span
    RangeFault,
    /// Flat current window while the partner sensor is moving
    StuckByVariance,
    /// No movement versus an hour ago while the partner sensor has moved
    StuckByDelta,
}

impl FaultReason {
    pub const fn is_fault(self) -> bool {
        !matches!(self, FaultReason::None)
    }
}

impl std::fmt::Display for FaultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultReason::None => write!(f, "None"),
            FaultReason::RangeFault => write!(f, "Range"),
            FaultReason::StuckByVariance => write!(f, "Stuck (variance)"),
            FaultReason::StuckByDelta => write!(f, "Stuck (delta)"),
        }
    }
}

/// Fault indicators for one sensor at one tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FaultSuspicion {
    /// Shared across both sensors: the two current averages disagree
    pub disagreement: bool,
    /// Current-window standard deviation above the noise threshold
    pub noise: bool,
    pub fault: FaultReason,
}

/// A rule outcome that had no single documented resolution.
///
/// The classifier still produces a deterministic result; these entries record
/// which default was applied so it can be logged and audited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAmbiguity {
    /// Both sensors noisy with identical standard deviation; both flags kept
    EqualNoiseStd { std_dev: f64 },
    /// Stuck-by-delta replaced a stuck-by-variance verdict on the same sensor
    StuckRulesOverlap { sensor: SensorId },
}

/// Output of the fault classifier for both sensors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaultReport {
    pub disagreement: bool,
    pub sensor1: FaultSuspicion,
    pub sensor2: FaultSuspicion,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguities: Vec<RuleAmbiguity>,
}

impl FaultReport {
    pub const fn get(&self, sensor: SensorId) -> &FaultSuspicion {
        match sensor {
            SensorId::Sensor1 => &self.sensor1,
            SensorId::Sensor2 => &self.sensor2,
        }
    }
}
