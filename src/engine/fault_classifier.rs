//! Fault Classifier - disagreement, noise, range and stuck-value rules
//!
//! Rule order within one tick:
//! 1. Disagreement between the two current averages (gates steps 3-5)
//! 2. Noise on each sensor, with the quieter sensor's flag cleared when both trip
//! 3. Range plausibility, sensor 1 checked before sensor 2
//! 4. Stuck by cross-sensor variance (names the flat sensor)
//! 5. Stuck by historical delta (names the sensor that has not moved)
//!
//! Steps 3-5 write a single fault slot per sensor. A later rule replaces an
//! earlier verdict for the same sensor; verdicts are never merged.

use tracing::{debug, warn};

use super::MaxFillRate;
use crate::config::RuleThresholds;
use crate::types::{FaultReason, FaultReport, FaultSuspicion, RuleAmbiguity, SensorId, SensorSample};

/// Disagreement-gated rules in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatedRule {
    Range,
    StuckByVariance,
    StuckByDelta,
}

impl GatedRule {
    const EVALUATION_ORDER: [Self; 3] = [Self::Range, Self::StuckByVariance, Self::StuckByDelta];

    const fn reason(self) -> FaultReason {
        match self {
            GatedRule::Range => FaultReason::RangeFault,
            GatedRule::StuckByVariance => FaultReason::StuckByVariance,
            GatedRule::StuckByDelta => FaultReason::StuckByDelta,
        }
    }

    /// Sensors this rule marks, in the order the marks are applied
    fn targets(
        self,
        samples: [&SensorSample; 2],
        max_fill_rate: f64,
        rules: &RuleThresholds,
    ) -> Vec<SensorId> {
        match self {
            // First match wins: sensor 2 is only checked when sensor 1 is in range
            GatedRule::Range => SensorId::BOTH
                .into_iter()
                .find(|id| !rules.in_range(samples[id.index()].now_avg))
                .into_iter()
                .collect(),

            // A moving while B is flat: B is stuck
            GatedRule::StuckByVariance => {
                let thr = rules.variance_threshold(max_fill_rate);
                SensorId::BOTH
                    .into_iter()
                    .filter_map(|a| {
                        let b = a.other();
                        let fires = samples[a.index()].now_std > thr
                            && samples[b.index()].now_std < thr;
                        fires.then_some(b)
                    })
                    .collect()
            }

            // A unchanged since an hour ago while B has moved: A is stuck
            GatedRule::StuckByDelta => {
                let thr = rules.delta_threshold(max_fill_rate);
                SensorId::BOTH
                    .into_iter()
                    .filter_map(|a| {
                        let b = a.other();
                        let fires = samples[a.index()].historical_delta() < thr
                            && samples[b.index()].historical_delta() > thr;
                        fires.then_some(a)
                    })
                    .collect()
            }
        }
    }
}

/// Evaluate all fault rules for one tank at one tick.
pub fn classify(
    sensor1: &SensorSample,
    sensor2: &SensorSample,
    max_fill_rate: MaxFillRate,
    rules: &RuleThresholds,
) -> FaultReport {
    let mfr = max_fill_rate.value();
    let samples = [sensor1, sensor2];
    let mut ambiguities = Vec::new();

    let disagreement = (sensor1.now_avg - sensor2.now_avg).abs() > rules.disagreement_pct;
    let noise = noise_flags(sensor1.now_std, sensor2.now_std, rules.noise_threshold(mfr), &mut ambiguities);

    let mut faults = [FaultReason::None; 2];
    if disagreement {
        debug!(
            sensor1 = sensor1.now_avg,
            sensor2 = sensor2.now_avg,
            "Sensors disagree, evaluating range and stuck rules"
        );
        for rule in GatedRule::EVALUATION_ORDER {
            for sensor in rule.targets(samples, mfr, rules) {
                let slot = &mut faults[sensor.index()];
                if *slot == FaultReason::StuckByVariance && rule == GatedRule::StuckByDelta {
                    warn!(
                        sensor = %sensor,
                        "Stuck-by-delta replaces stuck-by-variance on the same sensor (later rule wins)"
                    );
                    ambiguities.push(RuleAmbiguity::StuckRulesOverlap { sensor });
                } else if slot.is_fault() {
                    debug!(sensor = %sensor, previous = %slot, replacement = %rule.reason(), "Fault verdict replaced");
                }
                debug!(sensor = %sensor, reason = %rule.reason(), "Fault rule fired");
                *slot = rule.reason();
            }
        }
    }

    let suspicion = |id: SensorId| FaultSuspicion {
        disagreement,
        noise: noise[id.index()],
        fault: faults[id.index()],
    };

    FaultReport {
        disagreement,
        sensor1: suspicion(SensorId::Sensor1),
        sensor2: suspicion(SensorId::Sensor2),
        ambiguities,
    }
}

/// Noise flags for both sensors.
///
/// When both exceed the threshold only the noisier sensor keeps its flag.
/// Identical standard deviations have no tie-break: both flags stay set.
fn noise_flags(
    std1: f64,
    std2: f64,
    threshold: f64,
    ambiguities: &mut Vec<RuleAmbiguity>,
) -> [bool; 2] {
    let mut flags = [std1 > threshold, std2 > threshold];
    if flags[0] && flags[1] {
        if std1 < std2 {
            flags[0] = false;
        } else if std2 < std1 {
            flags[1] = false;
        } else {
            warn!(std_dev = std1, "Both sensors equally noisy, keeping both noise flags");
            ambiguities.push(RuleAmbiguity::EqualNoiseStd { std_dev: std1 });
        }
    }
    flags
}
