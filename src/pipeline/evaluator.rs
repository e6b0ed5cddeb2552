//! Sampler + rule engine for a single tank

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::acquisition::WindowSampler;
use crate::config::{RuleThresholds, TankConfig};
use crate::engine::{self, EvaluationError, MaxFillRate};
use crate::types::{TankOutcome, TankReport};

/// Evaluates one tank at one tick.
///
/// Holds no per-tank state: the same historian answers for the same T
/// always yield the same outcome.
#[derive(Clone)]
pub struct TankEvaluator {
    sampler: WindowSampler,
    rules: RuleThresholds,
}

impl TankEvaluator {
    pub fn new(sampler: WindowSampler, rules: RuleThresholds) -> Self {
        Self { sampler, rules }
    }

    pub fn sampler(&self) -> &WindowSampler {
        &self.sampler
    }

    /// Evaluate `tank` at time `at`.
    ///
    /// A tank without a usable Max_Fill_Rate fails before any historian
    /// query is issued.
    pub async fn evaluate(&self, tank: &TankConfig, at: DateTime<Utc>) -> TankOutcome {
        match self.try_evaluate(tank, at).await {
            Ok(report) => TankOutcome::Evaluated(report),
            Err(e) => {
                warn!(tank = %tank.name, error = %e, "No sensor selected this tick");
                TankOutcome::Failed {
                    tank: tank.name.clone(),
                    evaluated_at: at,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_evaluate(&self, tank: &TankConfig, at: DateTime<Utc>) -> Result<TankReport, EvaluationError> {
        let max_fill_rate = MaxFillRate::new(tank.max_fill_rate)?;

        let (sensor1, sensor2) = self
            .sampler
            .sample_pair(&tank.sensor1_tag, &tank.sensor2_tag, at)
            .await;
        let evaluation = engine::evaluate(&sensor1, &sensor2, max_fill_rate, &self.rules)?;

        debug!(
            tank = %tank.name,
            active = %evaluation.selection.active_sensor,
            reason = %evaluation.selection.reason,
            "Tank evaluated"
        );

        Ok(TankReport {
            tank: tank.name.clone(),
            evaluated_at: at,
            sensor1,
            sensor2,
            faults: evaluation.faults,
            selection: evaluation.selection,
            fill_rate: evaluation.fill_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistorianConfig;
    use crate::historian::MemoryHistorian;
    use crate::types::{SelectionReason, SensorId};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    /// Flat value over both windows for each tag listed
    fn historian(tags: &[(&str, f64, f64)]) -> MemoryHistorian {
        let mut h = MemoryHistorian::new();
        for &(tag, now, lag) in tags {
            for m in 0..=6 {
                h.insert(tag, t() - Duration::minutes(m), now);
                h.insert(tag, t() - Duration::minutes(60 + m), lag);
            }
        }
        h
    }

    fn evaluator(h: MemoryHistorian) -> TankEvaluator {
        let sampler = WindowSampler::new(Arc::new(h), &HistorianConfig::default());
        TankEvaluator::new(sampler, RuleThresholds::default())
    }

    #[tokio::test]
    async fn test_missing_max_fill_rate_fails_tank() {
        let ev = evaluator(historian(&[("LT1", 50.0, 40.0), ("LT2", 50.5, 40.0)]));
        let tank = TankConfig::new("TK-1", "LT1", "LT2", None);
        let outcome = ev.evaluate(&tank, t()).await;
        assert!(matches!(outcome, TankOutcome::Failed { .. }));
        assert!(!outcome.fill_rate_warning());
    }

    #[tokio::test]
    async fn test_healthy_tank_selects_sensor1() {
        let ev = evaluator(historian(&[("LT1", 50.0, 40.0), ("LT2", 50.5, 40.2)]));
        let tank = TankConfig::new("TK-1", "LT1", "LT2", Some(20.0));
        let outcome = ev.evaluate(&tank, t()).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.active_sensor(), SensorId::Sensor1);
        assert_eq!(report.selection.reason, SelectionReason::NoFaultsDefault);
        assert_eq!(report.fill_rate.rate, 10.0);
        assert!(!report.fill_rate_warning());
    }

    #[tokio::test]
    async fn test_unknown_tag_falls_back_to_reporting_sensor() {
        let ev = evaluator(historian(&[("LT2", 70.0, 40.0)]));
        let tank = TankConfig::new("TK-1", "LT1", "LT2", Some(25.0));
        let report = ev.evaluate(&tank, t()).await.report().cloned().unwrap();
        assert!(!report.sensor1.is_available());
        assert_eq!(report.active_sensor(), SensorId::Sensor2);
        assert_eq!(report.selection.reason, SelectionReason::OtherSensorNoData);
        assert!(report.fill_rate_warning());
    }
}
