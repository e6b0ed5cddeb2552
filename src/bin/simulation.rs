//! Tank Level Simulation
//!
//! Generates synthetic historian data for one tank with two redundant level
//! sensors, for exercising LevelWatch. Scenarios:
//! - Healthy sensors tracking a steady fill
//! - One sensor stuck at a frozen value
//! - One sensor noisy
//! - One sensor not installed (reads exactly zero)
//! - One sensor dropping out of the historian
//! - Both sensors tracking a fill that exceeds the maximum rate
//!
//! Output is CSV `timestamp,tag,value` on stdout, the format
//! `levelwatch --csv` reads.
//!
//! # Usage
//! ```bash
//! ./simulation --scenario stuck --hours 3 > stuck.csv
//! ./levelwatch --csv stuck.csv --replay-from 2024-01-01T01:10:00Z
//! ```

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};

// ============================================================================
// Process Constants
// ============================================================================

/// Level at the start of the simulation (% of span)
const START_LEVEL: f64 = 40.0;
/// Normal fill rate (% of span per hour)
const NORMAL_FILL_RATE: f64 = 8.0;
/// Fill rate in the overfill scenario (% of span per hour)
const OVERFILL_RATE: f64 = 30.0;
/// Sensor noise std for a healthy transmitter (% of span)
const HEALTHY_NOISE: f64 = 0.2;
/// Sensor noise std for a noisy transmitter (% of span)
const NOISY_NOISE: f64 = 4.0;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Healthy,
    Stuck,
    Noisy,
    Absent,
    Dropout,
    Overfill,
}

impl Scenario {
    fn name(self) -> &'static str {
        match self {
            Scenario::Healthy => "Healthy (both sensors track the fill)",
            Scenario::Stuck => "Stuck (sensor 2 freezes)",
            Scenario::Noisy => "Noisy (sensor 1 noise exceeds threshold)",
            Scenario::Absent => "Absent (sensor 2 not installed, reads 0)",
            Scenario::Dropout => "Dropout (sensor 1 stops historizing)",
            Scenario::Overfill => "Overfill (fill rate above maximum)",
        }
    }

    fn fill_rate(self) -> f64 {
        match self {
            Scenario::Overfill => OVERFILL_RATE,
            _ => NORMAL_FILL_RATE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tank-simulation")]
#[command(about = "Two-sensor tank level simulation for LevelWatch testing")]
#[command(version = "1.0")]
struct Args {
    /// Scenario to simulate
    #[arg(long, value_enum, default_value = "healthy")]
    scenario: Scenario,

    /// Simulation duration in hours (1-24)
    #[arg(short = 'H', long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=24))]
    hours: u32,

    /// Seconds between historized samples
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=600))]
    sample_secs: u32,

    /// Fraction of the run after which the scenario's fault starts
    #[arg(long, default_value = "0.4")]
    fault_at: f64,

    /// Simulation start time (RFC 3339)
    #[arg(long, default_value = "2024-01-01T00:00:00Z")]
    start: String,

    #[arg(long, default_value = "TK101_LT1")]
    sensor1_tag: String,

    #[arg(long, default_value = "TK101_LT2")]
    sensor2_tag: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress mission log (only output samples)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimulationState {
    rng: StdRng,
    scenario: Scenario,
    level: f64,
    /// Sensor 2 value once frozen in the stuck scenario
    frozen: Option<f64>,
    healthy_noise: Normal<f64>,
    noisy_noise: Normal<f64>,
}

impl SimulationState {
    fn new(scenario: Scenario, seed: Option<u64>) -> Result<Self, rand_distr::NormalError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            scenario,
            level: START_LEVEL,
            frozen: None,
            healthy_noise: Normal::new(0.0, HEALTHY_NOISE)?,
            noisy_noise: Normal::new(0.0, NOISY_NOISE)?,
        })
    }

    fn advance(&mut self, dt_hours: f64) {
        self.level = (self.level + self.scenario.fill_rate() * dt_hours).clamp(0.0, 100.0);
    }

    fn reading(&mut self, noise: bool) -> f64 {
        let n = if noise {
            self.noisy_noise.sample(&mut self.rng)
        } else {
            self.healthy_noise.sample(&mut self.rng)
        };
        (self.level + n).clamp(0.0, 100.0)
    }

    /// Sensor values at this step; `None` means nothing is historized
    fn sample(&mut self, faulted: bool) -> (Option<f64>, Option<f64>) {
        let healthy = self.reading(false);
        match (self.scenario, faulted) {
            (Scenario::Stuck, true) => {
                let frozen = *self.frozen.get_or_insert(healthy);
                (Some(self.reading(false)), Some(frozen))
            }
            (Scenario::Noisy, true) => (Some(self.reading(true)), Some(healthy)),
            (Scenario::Absent, _) => (Some(healthy), Some(0.0)),
            (Scenario::Dropout, true) => (None, Some(healthy)),
            _ => (Some(healthy), Some(self.reading(false))),
        }
    }
}

// ============================================================================
// Logging Helpers
// ============================================================================

fn log_mission(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[sim] {}", message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(&args.start)?.with_timezone(&Utc);
    let fault_at = args.fault_at.clamp(0.0, 1.0);

    let mut state = SimulationState::new(args.scenario, args.seed)?;
    let total_steps = u64::from(args.hours) * 3600 / u64::from(args.sample_secs);
    let dt_hours = f64::from(args.sample_secs) / 3600.0;
    let fault_step = (total_steps as f64 * fault_at) as u64;

    log_mission(&"=".repeat(70), args.quiet);
    log_mission("TANK LEVEL SIMULATION v1.0", args.quiet);
    log_mission(&format!("  Scenario: {}", args.scenario.name()), args.quiet);
    log_mission(&format!("  Tags: {} / {}", args.sensor1_tag, args.sensor2_tag), args.quiet);
    log_mission(&format!("  Duration: {} h ({} samples per tag)", args.hours, total_steps + 1), args.quiet);
    log_mission(&format!("  Fill rate: {:.1} %/h from {:.1} %", args.scenario.fill_rate(), START_LEVEL), args.quiet);
    if args.scenario != Scenario::Healthy && args.scenario != Scenario::Overfill {
        let onset = start + Duration::seconds((fault_step * u64::from(args.sample_secs)) as i64);
        log_mission(&format!("  Fault onset: {}", onset.to_rfc3339()), args.quiet);
    }
    if let Some(seed) = args.seed {
        log_mission(&format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(&"=".repeat(70), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "timestamp,tag,value")?;

    let mut rows = 0u64;
    for step in 0..=total_steps {
        let at = start + Duration::seconds((step * u64::from(args.sample_secs)) as i64);
        let (s1, s2) = state.sample(step >= fault_step && fault_at < 1.0);
        let ts = at.to_rfc3339();

        if let Some(v) = s1 {
            writeln!(out, "{},{},{:.3}", ts, args.sensor1_tag, v)?;
            rows += 1;
        }
        if let Some(v) = s2 {
            writeln!(out, "{},{},{:.3}", ts, args.sensor2_tag, v)?;
            rows += 1;
        }

        state.advance(dt_hours);
    }
    out.flush()?;
    drop(out);

    log_mission(&format!("SIMULATION COMPLETE: {} rows, final level {:.1} %", rows, state.level), args.quiet);
    Ok(())
}
