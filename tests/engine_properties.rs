//! Rule Engine Property Tests
//!
//! Exercises the fault classifier, sensor selector and fill-rate monitor
//! together through `engine::evaluate`, with hand-built window samples.

use levelwatch::config::RuleThresholds;
use levelwatch::engine::{classify, evaluate, MaxFillRate};
use levelwatch::types::{
    FaultReason, RuleAmbiguity, SelectionReason, SensorId, SensorReading, SensorSample,
};

fn sample(tag: &str, now_avg: f64, now_std: f64, lag_avg: f64) -> SensorSample {
    SensorSample::new(tag, now_avg, now_std, lag_avg)
}

fn reading(tag: &str, now_avg: f64, now_std: f64, lag_avg: f64) -> SensorReading {
    sample(tag, now_avg, now_std, lag_avg).into()
}

fn mfr(v: f64) -> MaxFillRate {
    MaxFillRate::new(Some(v)).unwrap()
}

// ============================================================================
// Selection invariant
// ============================================================================

/// Across a spread of inputs, the fill-rate check always runs on the one
/// sensor the selector activated.
#[test]
fn fill_rate_always_uses_the_single_active_sensor() {
    let levels = [0.0, 2.0, 30.0, 50.0, 52.0, 97.0, 99.5];
    let stds = [0.0, 0.5, 1.5, 3.0];
    let rules = RuleThresholds::default();

    for &a1 in &levels {
        for &a2 in &levels {
            for &s1 in &stds {
                for &s2 in &stds {
                    let r1 = reading("LT1", a1, s1, a1 - 5.0);
                    let r2 = reading("LT2", a2, s2, 40.0);
                    let eval = evaluate(&r1, &r2, mfr(20.0), &rules).unwrap();
                    assert_eq!(eval.fill_rate.sensor, eval.selection.active_sensor);
                    let active = if eval.selection.is_active(SensorId::Sensor1) { &r1 } else { &r2 };
                    let expected = active.sample().unwrap().fill_rate();
                    assert_eq!(eval.fill_rate.rate, expected);
                }
            }
        }
    }
}

// ============================================================================
// Disagreement gate
// ============================================================================

#[test]
fn agreement_skips_range_and_stuck_rules() {
    // Sensor 1 out of range and flat while sensor 2 moves, but they agree within 5
    let s1 = sample("LT1", 99.5, 0.1, 99.5);
    let s2 = sample("LT2", 96.0, 2.0, 80.0);
    let report = classify(&s1, &s2, mfr(20.0), &RuleThresholds::default());
    assert!(!report.disagreement);
    assert_eq!(report.sensor1.fault, FaultReason::None);
    assert_eq!(report.sensor2.fault, FaultReason::None);
}

#[test]
fn exactly_five_points_apart_is_not_disagreement() {
    let s1 = sample("LT1", 55.0, 0.1, 55.0);
    let s2 = sample("LT2", 50.0, 0.1, 50.0);
    assert!(!classify(&s1, &s2, mfr(20.0), &RuleThresholds::default()).disagreement);
}

#[test]
fn disagreement_with_both_in_range_has_no_range_fault() {
    let s1 = sample("LT1", 50.0, 0.5, 49.0);
    let s2 = sample("LT2", 30.0, 0.5, 29.0);
    let report = classify(&s1, &s2, mfr(20.0), &RuleThresholds::default());
    assert!(report.disagreement);
    assert!(report.sensor1.disagreement && report.sensor2.disagreement);
    assert_ne!(report.sensor1.fault, FaultReason::RangeFault);
    assert_ne!(report.sensor2.fault, FaultReason::RangeFault);
}

// ============================================================================
// Noise
// ============================================================================

#[test]
fn stds_below_threshold_raise_no_noise() {
    // Threshold is 0.12 * 20 = 2.4
    let s1 = sample("LT1", 50.0, 2.39, 45.0);
    let s2 = sample("LT2", 51.0, 1.0, 46.0);
    let report = classify(&s1, &s2, mfr(20.0), &RuleThresholds::default());
    assert!(!report.sensor1.noise);
    assert!(!report.sensor2.noise);
}

#[test]
fn equal_noise_keeps_both_flags_and_records_ambiguity() {
    let s1 = sample("LT1", 50.0, 3.0, 45.0);
    let s2 = sample("LT2", 51.0, 3.0, 46.0);
    let report = classify(&s1, &s2, mfr(20.0), &RuleThresholds::default());
    assert!(report.sensor1.noise && report.sensor2.noise);
    assert_eq!(report.ambiguities, vec![RuleAmbiguity::EqualNoiseStd { std_dev: 3.0 }]);
}

// ============================================================================
// Stuck rules
// ============================================================================

#[test]
fn delta_rule_overrides_variance_rule_on_same_sensor() {
    // Sensor 1 flat and unchanged for an hour; sensor 2 moving
    let s1 = reading("LT1", 50.0, 0.1, 50.0);
    let s2 = reading("LT2", 60.0, 1.5, 40.0);
    let eval = evaluate(&s1, &s2, mfr(20.0), &RuleThresholds::default()).unwrap();

    let faults = eval.faults.unwrap();
    assert_eq!(faults.sensor1.fault, FaultReason::StuckByDelta);
    assert_eq!(faults.sensor2.fault, FaultReason::None);
    assert_eq!(
        faults.ambiguities,
        vec![RuleAmbiguity::StuckRulesOverlap { sensor: SensorId::Sensor1 }]
    );

    assert_eq!(eval.selection.active_sensor, SensorId::Sensor2);
    assert_eq!(eval.selection.reason, SelectionReason::OtherSensorFaulted);
    // Rise of 20 against a maximum of 20
    assert!(eval.fill_rate.warning);
}

// ============================================================================
// Availability
// ============================================================================

#[test]
fn zero_sensor1_always_selects_sensor2() {
    let partners = [
        reading("LT2", 50.0, 0.5, 45.0),
        reading("LT2", 99.5, 0.1, 99.5),
        reading("LT2", 50.0, 5.0, 45.0),
        reading("LT2", 1.0, 0.0, 1.0),
    ];
    for partner in &partners {
        let eval = evaluate(&reading("LT1", 0.0, 0.0, 0.0), partner, mfr(20.0), &RuleThresholds::default())
            .unwrap();
        assert_eq!(eval.selection.active_sensor, SensorId::Sensor2);
        assert_eq!(eval.selection.reason, SelectionReason::OtherSensorAbsent);
    }
}

#[test]
fn one_missing_sensor_skips_classification() {
    let missing = SensorReading::NoData {
        tag: "LT2".to_string(),
        reason: "unknown tag 'LT2'".to_string(),
    };
    let eval = evaluate(&reading("LT1", 70.0, 0.3, 60.0), &missing, mfr(20.0), &RuleThresholds::default())
        .unwrap();
    assert!(eval.faults.is_none());
    assert_eq!(eval.selection.active_sensor, SensorId::Sensor1);
    assert_eq!(eval.selection.reason, SelectionReason::OtherSensorNoData);
}

// ============================================================================
// Fill rate
// ============================================================================

#[test]
fn rise_of_thirty_against_twenty_five_warns() {
    let s1 = reading("LT1", 80.0, 0.5, 50.0);
    let s2 = reading("LT2", 80.5, 0.5, 50.5);
    let eval = evaluate(&s1, &s2, mfr(25.0), &RuleThresholds::default()).unwrap();
    assert_eq!(eval.selection.active_sensor, SensorId::Sensor1);
    assert_eq!(eval.fill_rate.rate, 30.0);
    assert!(eval.fill_rate.warning);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn identical_inputs_give_identical_results() {
    let cases = [
        (reading("LT1", 50.0, 0.1, 50.0), reading("LT2", 60.0, 1.5, 40.0)),
        (reading("LT1", 50.0, 3.0, 45.0), reading("LT2", 51.0, 3.0, 46.0)),
        (reading("LT1", 0.0, 0.0, 0.0), reading("LT2", 99.0, 0.2, 80.0)),
    ];
    let rules = RuleThresholds::default();
    for (s1, s2) in &cases {
        let first = evaluate(s1, s2, mfr(20.0), &rules).unwrap();
        let second = evaluate(s1, s2, mfr(20.0), &rules).unwrap();
        assert_eq!(first, second);
    }
}
