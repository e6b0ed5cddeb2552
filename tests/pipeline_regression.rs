//! Pipeline Regression Tests
//!
//! End-to-end: in-memory historian -> window sampler -> rule engine ->
//! monitor loop -> sinks. Tank histories are synthetic ramps sampled once a
//! minute, so every window mean and standard deviation is known in advance.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use levelwatch::config::{HistorianConfig, MonitorConfig, TankConfig};
use levelwatch::historian::csv::read_csv;
use levelwatch::historian::{Historian, HistorianError, MemoryHistorian};
use levelwatch::history_storage::EvaluationHistory;
use levelwatch::pipeline::{AlarmSink, HistorySink, JsonLinesSink, MonitorLoop, SinkError};
use levelwatch::types::{FaultReason, SelectionReason, SensorId, TankOutcome, WindowStatistics};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn t() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// One sample per minute over `[T-70min, T]`; `f` maps minutes since T-70 to a level
fn ramp(h: &mut MemoryHistorian, tag: &str, f: impl Fn(f64) -> f64) {
    let origin = t() - Duration::minutes(70);
    for m in 0..=70 {
        h.insert(tag, origin + Duration::minutes(m), f(m as f64));
    }
}

/// Four tanks:
/// - HEALTHY: both sensors rise 12 %/h
/// - STUCK: sensor 2 frozen at 30 while sensor 1 rises 12 %/h
/// - OVERFILL: both rise 30 %/h against a maximum of 25
/// - NOCONF: no max_fill_rate
fn tank_farm() -> (MemoryHistorian, Vec<TankConfig>) {
    let mut h = MemoryHistorian::named("test");
    ramp(&mut h, "H_LT1", |m| 40.0 + 0.2 * m);
    ramp(&mut h, "H_LT2", |m| 40.3 + 0.2 * m);
    ramp(&mut h, "S_LT1", |m| 40.0 + 0.2 * m);
    ramp(&mut h, "S_LT2", |_| 30.0);
    ramp(&mut h, "O_LT1", |m| 20.0 + 0.5 * m);
    ramp(&mut h, "O_LT2", |m| 20.5 + 0.5 * m);

    let tanks = vec![
        TankConfig::new("HEALTHY", "H_LT1", "H_LT2", Some(20.0)),
        TankConfig::new("STUCK", "S_LT1", "S_LT2", Some(20.0)),
        TankConfig::new("OVERFILL", "O_LT1", "O_LT2", Some(25.0)),
        TankConfig::new("NOCONF", "H_LT1", "H_LT2", None),
    ];
    (h, tanks)
}

fn monitor(historian: impl Historian + 'static, tanks: Vec<TankConfig>) -> MonitorLoop {
    let config = MonitorConfig {
        tanks,
        ..MonitorConfig::default()
    };
    MonitorLoop::from_config(&config, Arc::new(historian), CancellationToken::new())
}

/// Keeps every published outcome
#[derive(Default)]
struct Collector(Mutex<Vec<TankOutcome>>);

#[async_trait]
impl AlarmSink for Collector {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(outcome.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collector"
    }
}

/// Always fails, to show a broken sink does not stop delivery to the others
struct BrokenSink;

#[async_trait]
impl AlarmSink for BrokenSink {
    async fn publish(&self, _outcome: &TankOutcome) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::other("disk full")))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn tank_farm_single_tick() {
    let (h, tanks) = tank_farm();
    let outcomes = monitor(h, tanks).evaluate_once(t()).await;
    assert_eq!(outcomes.len(), 4);

    let healthy = outcomes[0].report().unwrap();
    assert_eq!(healthy.active_sensor(), SensorId::Sensor1);
    assert_eq!(healthy.selection.reason, SelectionReason::NoFaultsDefault);
    assert!((healthy.fill_rate.rate - 12.0).abs() < 1e-9);
    assert!(!healthy.fill_rate_warning());

    let stuck = outcomes[1].report().unwrap();
    let faults = stuck.faults.as_ref().unwrap();
    assert!(faults.disagreement);
    assert_eq!(faults.sensor2.fault, FaultReason::StuckByDelta);
    assert_eq!(faults.sensor1.fault, FaultReason::None);
    assert_eq!(stuck.active_sensor(), SensorId::Sensor1);
    assert_eq!(stuck.selection.reason, SelectionReason::OtherSensorFaulted);

    let overfill = outcomes[2].report().unwrap();
    assert!((overfill.fill_rate.rate - 30.0).abs() < 1e-9);
    assert!(overfill.fill_rate_warning());

    match &outcomes[3] {
        TankOutcome::Failed { tank, error, .. } => {
            assert_eq!(tank, "NOCONF");
            assert!(error.contains("max_fill_rate"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn run_publishes_to_every_sink_and_counts() {
    let (h, tanks) = tank_farm();
    let dir = tempfile::tempdir().unwrap();
    let history = EvaluationHistory::open(dir.path()).unwrap();
    let collector = Arc::new(Collector::default());

    let stats = monitor(h, tanks)
        .with_sink(Box::new(BrokenSink))
        .with_sink(Box::new(Arc::clone(&collector)))
        .with_sink(Box::new(HistorySink::new(history.clone())))
        .with_replay(t(), Duration::minutes(1))
        .with_max_ticks(1)
        .run()
        .await;

    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.evaluations, 3);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.errors, 1);

    assert_eq!(collector.0.lock().unwrap().len(), 4);
    // Failed evaluations carry no report to persist
    assert_eq!(history.count(), 3);
    assert_eq!(history.recent("OVERFILL", 5)[0].evaluated_at, t());
}

#[tokio::test]
async fn missing_tags_degrade_per_sensor() {
    let mut h = MemoryHistorian::new();
    ramp(&mut h, "LT2", |m| 40.0 + 0.2 * m);
    let tanks = vec![
        TankConfig::new("ONE-MISSING", "LT1", "LT2", Some(20.0)),
        TankConfig::new("BOTH-MISSING", "LT8", "LT9", Some(20.0)),
    ];
    let outcomes = monitor(h, tanks).evaluate_once(t()).await;

    let report = outcomes[0].report().unwrap();
    assert!(!report.sensor1.is_available());
    assert!(report.faults.is_none());
    assert_eq!(report.active_sensor(), SensorId::Sensor2);
    assert_eq!(report.selection.reason, SelectionReason::OtherSensorNoData);

    assert!(outcomes[1].report().is_none());
    assert!(!outcomes[1].fill_rate_warning());
}

#[tokio::test]
async fn zero_reading_sensor_is_absent_not_missing() {
    let mut h = MemoryHistorian::new();
    ramp(&mut h, "LT1", |_| 0.0);
    ramp(&mut h, "LT2", |m| 40.0 + 0.2 * m);
    let tanks = vec![TankConfig::new("TK", "LT1", "LT2", Some(20.0))];
    let outcomes = monitor(h, tanks).evaluate_once(t()).await;

    let report = outcomes[0].report().unwrap();
    assert!(report.sensor1.is_available());
    assert_eq!(report.active_sensor(), SensorId::Sensor2);
    assert_eq!(report.selection.reason, SelectionReason::OtherSensorAbsent);
}

/// Historian that answers far slower than the query timeout
struct SlowHistorian;

#[async_trait]
impl Historian for SlowHistorian {
    async fn window_average(
        &self,
        _tag: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64, HistorianError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(50.0)
    }

    async fn window_statistics(
        &self,
        _tag: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<WindowStatistics, HistorianError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok(WindowStatistics {
            mean: 50.0,
            std_dev: 0.1,
            count: 7,
        })
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn historian_timeouts_are_missing_data() {
    let config = MonitorConfig {
        historian: HistorianConfig {
            query_timeout_ms: 20,
            ..HistorianConfig::default()
        },
        tanks: vec![TankConfig::new("TK", "LT1", "LT2", Some(20.0))],
        ..MonitorConfig::default()
    };
    let monitor = MonitorLoop::from_config(&config, Arc::new(SlowHistorian), CancellationToken::new());
    let outcomes = monitor.evaluate_once(t()).await;

    match &outcomes[0] {
        TankOutcome::Failed { error, .. } => assert!(error.contains("timed out")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn csv_history_replays_and_serializes() {
    let mut csv = String::from("timestamp,tag,value\n");
    let origin = t() - Duration::minutes(70);
    for m in 0..=70 {
        let ts = (origin + Duration::minutes(m)).to_rfc3339();
        csv.push_str(&format!("{ts},LT1,{}\n", 20.0 + 0.5 * m as f64));
        csv.push_str(&format!("{ts},LT2,{}\n", 20.5 + 0.5 * m as f64));
    }
    csv.push_str("not,a,row\n");

    let h = read_csv(csv.as_bytes(), "csv").unwrap();
    assert_eq!(h.sample_count(), 142);

    let sink = Arc::new(JsonLinesSink::new(Vec::new()));
    let tanks = vec![TankConfig::new("TK", "LT1", "LT2", Some(25.0))];
    let outcomes = monitor(h, tanks)
        .with_sink(Box::new(Arc::clone(&sink)))
        .tick(t())
        .await;
    assert!(outcomes[0].fill_rate_warning());

    let sink = Arc::try_unwrap(sink).ok().unwrap();
    let out = String::from_utf8(sink.into_inner()).unwrap();
    let line = out.lines().next().unwrap();
    let parsed: TankOutcome = serde_json::from_str(line).unwrap();
    assert_eq!(parsed.tank(), "TK");
    assert!(parsed.fill_rate_warning());

    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(value["outcome"], "evaluated");
    assert_eq!(value["sensor1"]["status"], "available");
    assert_eq!(value["fill_rate"]["warning"], true);
}
