//! Scheduler loop shared by live monitoring and historical replay.
//!
//! Every tick picks one evaluation time T, evaluates all tanks at that T
//! concurrently, and hands each outcome to every sink.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::sink::AlarmSink;
use super::TankEvaluator;
use crate::acquisition::WindowSampler;
use crate::config::{MonitorConfig, TankConfig};
use crate::historian::Historian;
use crate::types::TankOutcome;

/// Smallest scheduler period; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_millis(1);

// ============================================================================
// Tick Clock
// ============================================================================

/// Where each tick's evaluation time comes from
#[derive(Debug, Clone)]
pub enum TickClock {
    /// T is the wall clock at the tick
    Wall,
    /// T advances from `next` by `step` on every tick, independent of the
    /// scheduler period
    Replay {
        next: DateTime<Utc>,
        step: chrono::Duration,
    },
}

impl TickClock {
    fn advance(&mut self) -> DateTime<Utc> {
        match self {
            TickClock::Wall => Utc::now(),
            TickClock::Replay { next, step } => {
                let at = *next;
                *next = at + *step;
                at
            }
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub ticks: u64,
    /// Tank evaluations that produced a selection
    pub evaluations: u64,
    /// Fill-rate warnings raised
    pub warnings: u64,
    /// Tank evaluations that produced no selection
    pub errors: u64,
}

impl MonitorStats {
    fn record(&mut self, outcome: &TankOutcome) {
        match outcome {
            TankOutcome::Evaluated(report) => {
                self.evaluations += 1;
                if report.fill_rate_warning() {
                    self.warnings += 1;
                }
            }
            TankOutcome::Failed { .. } => self.errors += 1,
        }
    }
}

// ============================================================================
// Monitor Loop
// ============================================================================

/// Owns everything needed to evaluate the configured tanks on a schedule.
///
/// Built with [`new()`](MonitorLoop::new) or
/// [`from_config()`](MonitorLoop::from_config), optionally given sinks, a
/// replay clock and a tick limit, then consumed by [`run()`](MonitorLoop::run).
pub struct MonitorLoop {
    evaluator: TankEvaluator,
    tanks: Vec<TankConfig>,
    sinks: Vec<Box<dyn AlarmSink>>,
    period: Duration,
    clock: TickClock,
    max_ticks: Option<u64>,
    cancel_token: CancellationToken,
}

impl MonitorLoop {
    pub fn new(
        evaluator: TankEvaluator,
        tanks: Vec<TankConfig>,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            evaluator,
            tanks,
            sinks: Vec::new(),
            period: period.max(MIN_PERIOD),
            clock: TickClock::Wall,
            max_ticks: None,
            cancel_token,
        }
    }

    /// Wire a loop from configuration: sampler geometry, rule thresholds,
    /// tank list, and tick period.
    pub fn from_config(
        config: &MonitorConfig,
        historian: Arc<dyn Historian>,
        cancel_token: CancellationToken,
    ) -> Self {
        let sampler = WindowSampler::new(historian, &config.historian);
        let evaluator = TankEvaluator::new(sampler, config.rules.clone());
        Self::new(
            evaluator,
            config.tanks.clone(),
            config.schedule.interval(),
            cancel_token,
        )
    }

    pub fn with_sink(mut self, sink: Box<dyn AlarmSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Evaluate at `start`, `start + step`, ... instead of the wall clock.
    pub fn with_replay(mut self, start: DateTime<Utc>, step: chrono::Duration) -> Self {
        self.clock = TickClock::Replay { next: start, step };
        self
    }

    /// Override the scheduler period (e.g. to replay history quickly).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(MIN_PERIOD);
        self
    }

    /// Stop after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Evaluate every tank at `at`, without publishing.
    ///
    /// Outcomes come back in tank configuration order.
    pub async fn evaluate_once(&self, at: DateTime<Utc>) -> Vec<TankOutcome> {
        join_all(self.tanks.iter().map(|tank| self.evaluator.evaluate(tank, at))).await
    }

    /// Evaluate every tank at `at` and publish each outcome to every sink.
    pub async fn tick(&self, at: DateTime<Utc>) -> Vec<TankOutcome> {
        let outcomes = self.evaluate_once(at).await;
        for outcome in &outcomes {
            self.publish(outcome).await;
        }
        outcomes
    }

    /// Run until cancellation or the tick limit.
    ///
    /// Returns final monitor statistics.
    pub async fn run(mut self) -> MonitorStats {
        let mut stats = MonitorStats::default();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "📊 Monitoring {} tank(s) from {} every {:?}",
            self.tanks.len(),
            self.evaluator.sampler().historian_name(),
            self.period
        );

        loop {
            if self.max_ticks.is_some_and(|max| stats.ticks >= max) {
                info!("[MonitorLoop] Tick limit reached ({} ticks)", stats.ticks);
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("[MonitorLoop] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {}
            }

            let at = self.clock.advance();
            let outcomes = self.tick(at).await;
            stats.ticks += 1;
            for outcome in &outcomes {
                stats.record(outcome);
            }

            if stats.ticks % 60 == 0 {
                info!(
                    "📈 Progress: {} ticks | Evaluations: {} | Warnings: {} | Errors: {}",
                    stats.ticks, stats.evaluations, stats.warnings, stats.errors
                );
            }
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("   Ticks:              {}", stats.ticks);
        info!("   Evaluations:        {}", stats.evaluations);
        info!("   Fill-rate warnings: {}", stats.warnings);
        info!("   Failed evaluations: {}", stats.errors);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        stats
    }

    async fn publish(&self, outcome: &TankOutcome) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(outcome).await {
                warn!(sink = sink.name(), tank = %outcome.tank(), "Sink publish failed: {}", e);
            }
        }
    }
}
