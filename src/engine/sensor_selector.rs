//! Sensor Selector - resolve fault indicators into exactly one active sensor
//!
//! Rules run in order and later rules override earlier choices:
//! 1. One sensor faulted, the other not: use the other
//! 2. One sensor noisy and the other not faulted: use the other
//! 3. No fault or noise anywhere: sensor 1
//! 4. Both faulted: sensor 1
//! 5. A sensor reading exactly zero is absent: use its partner
//! 6. Consistency: both active keeps sensor 1, none active falls back to sensor 1

use tracing::debug;

use crate::types::{FaultReport, SelectionDecision, SelectionReason, SensorId, SensorSample};

/// Selection flags while the ordered rules are applied
struct SelectionState {
    active: [bool; 2],
    reason: SelectionReason,
}

impl SelectionState {
    const fn new() -> Self {
        Self {
            active: [false, false],
            reason: SelectionReason::NoneActiveFallback,
        }
    }

    /// Activate `sensor` and deactivate its partner
    fn choose(&mut self, sensor: SensorId, reason: SelectionReason) {
        debug!(sensor = %sensor, reason = %reason, "Selection rule fired");
        self.active[sensor.index()] = true;
        self.active[sensor.other().index()] = false;
        self.reason = reason;
    }

    fn into_decision(mut self) -> SelectionDecision {
        match self.active {
            [true, true] => {
                self.active[SensorId::Sensor2.index()] = false;
                self.reason = SelectionReason::BothActiveResolved;
            }
            [false, false] => {
                self.active[SensorId::Sensor1.index()] = true;
                self.reason = SelectionReason::NoneActiveFallback;
            }
            _ => {}
        }
        let active_sensor = if self.active[SensorId::Sensor1.index()] {
            SensorId::Sensor1
        } else {
            SensorId::Sensor2
        };
        SelectionDecision {
            active_sensor,
            reason: self.reason,
        }
    }
}

/// Choose the sensor to trust for this tick.
pub fn select(sensor1: &SensorSample, sensor2: &SensorSample, faults: &FaultReport) -> SelectionDecision {
    let faulted = |id: SensorId| faults.get(id).fault.is_fault();
    let noisy = |id: SensorId| faults.get(id).noise;
    let mut state = SelectionState::new();

    // 1. Exactly one sensor faulted
    if faulted(SensorId::Sensor1) != faulted(SensorId::Sensor2) {
        let healthy = if faulted(SensorId::Sensor1) {
            SensorId::Sensor2
        } else {
            SensorId::Sensor1
        };
        state.choose(healthy, SelectionReason::OtherSensorFaulted);
    }

    // 2. Exactly one sensor noisy, partner not faulted
    if noisy(SensorId::Sensor1) != noisy(SensorId::Sensor2) {
        let quiet = if noisy(SensorId::Sensor1) {
            SensorId::Sensor2
        } else {
            SensorId::Sensor1
        };
        if !faulted(quiet) {
            state.choose(quiet, SelectionReason::OtherSensorNoisy);
        }
    }

    // 3. Nothing flagged
    if SensorId::BOTH.iter().all(|&id| !faulted(id) && !noisy(id)) {
        state.choose(SensorId::Sensor1, SelectionReason::NoFaultsDefault);
    }

    // 4. Both faulted
    if faulted(SensorId::Sensor1) && faulted(SensorId::Sensor2) {
        state.choose(SensorId::Sensor1, SelectionReason::BothFaultedDefault);
    }

    // 5. Availability override
    if sensor1.is_absent() {
        state.choose(SensorId::Sensor2, SelectionReason::OtherSensorAbsent);
    }
    if sensor2.is_absent() {
        state.choose(SensorId::Sensor1, SelectionReason::OtherSensorAbsent);
    }

    // 6. Consistency enforcement
    state.into_decision()
}

/// Decision when only one sensor produced data this tick
pub fn select_sole_reporting(available: SensorId) -> SelectionDecision {
    SelectionDecision {
        active_sensor: available,
        reason: SelectionReason::OtherSensorNoData,
    }
}
