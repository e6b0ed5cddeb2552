//! LevelWatch - redundant tank level sensor arbitration
//!
//! Evaluates every configured tank on a fixed tick: samples both level
//! sensors from the historian, selects the trustworthy one, and raises a
//! fill-rate warning when its hour-over-hour rise reaches the tank maximum.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate all tanks once at a given time
//! ./levelwatch --csv history.csv --at 2024-06-01T09:00:00Z
//!
//! # Replay two hours of history at one-minute ticks, as JSON lines
//! ./levelwatch --csv history.csv --replay-from 2024-06-01T08:00:00Z --ticks 120 --json
//!
//! # Generate synthetic history and evaluate it
//! ./simulation --scenario stuck > stuck.csv
//! ./levelwatch --csv stuck.csv --replay-from 2024-01-01T01:10:00Z --ticks 30
//! ```
//!
//! # Environment Variables
//!
//! - `LEVELWATCH_CONFIG`: Path to the monitor config (default: ./levelwatch.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use levelwatch::config::MonitorConfig;
use levelwatch::historian::csv::load_csv;
use levelwatch::history_storage::EvaluationHistory;
use levelwatch::pipeline::{HistorySink, JsonLinesSink, LogSink, MonitorLoop};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "levelwatch")]
#[command(about = "Redundant tank level sensor arbitration and fill-rate monitoring")]
#[command(version)]
struct CliArgs {
    /// Monitor config file (default: $LEVELWATCH_CONFIG, then ./levelwatch.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Historian export with rows `timestamp,tag,value`
    #[arg(long, value_name = "FILE")]
    csv: PathBuf,

    /// Evaluate every tank once at this time (RFC 3339) and exit
    #[arg(long, value_name = "TIME", conflicts_with = "replay_from")]
    at: Option<String>,

    /// Replay history: first tick evaluates at this time (RFC 3339)
    #[arg(long, value_name = "TIME")]
    replay_from: Option<String>,

    /// Evaluation-time step between replay ticks (default: schedule interval)
    #[arg(long, value_name = "SECS")]
    step_secs: Option<u64>,

    /// Real delay between replay ticks in milliseconds (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    pace_ms: u64,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the schedule interval for live monitoring
    #[arg(long, value_name = "SECS")]
    interval_secs: Option<u64>,

    /// Persist successful evaluations to a sled database at this path
    #[arg(long, value_name = "DIR")]
    history_db: Option<PathBuf>,

    /// Write each outcome as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Validate the config, print it as TOML, and exit
    #[arg(long)]
    check_config: bool,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid RFC 3339 time '{}'", value))?;
    Ok(parsed.with_timezone(&Utc))
}

fn load_config(path: Option<&PathBuf>) -> Result<MonitorConfig> {
    match path {
        Some(p) => MonitorConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(MonitorConfig::load()),
    }
}

fn flush_history(history: Option<&EvaluationHistory>) -> Result<()> {
    if let Some(history) = history {
        history.flush().context("Failed to flush evaluation history")?;
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config = load_config(args.config.as_ref())?;
    if let Some(secs) = args.interval_secs {
        config.schedule.interval_secs = secs;
    }

    if args.check_config {
        config.validate()?;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  LevelWatch - Redundant Level Sensor Arbitration");
    info!("  Site: {} | Tanks: {}", config.site.name, config.tanks.len());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config.tanks.is_empty() {
        warn!("No tanks configured; nothing to evaluate");
    }

    let historian = load_csv(&args.csv)?;
    info!(
        "📥 Historian: {} ({} tags, {} samples)",
        args.csv.display(),
        historian.tag_count(),
        historian.sample_count()
    );
    let history_end = historian.time_span().map(|(_, end)| end);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut monitor = MonitorLoop::from_config(&config, Arc::new(historian), cancel_token)
        .with_sink(Box::new(LogSink));
    if args.json {
        monitor = monitor.with_sink(Box::new(JsonLinesSink::stdout()));
    }
    let mut history = None;
    if let Some(path) = &args.history_db {
        let opened = EvaluationHistory::open(path)
            .with_context(|| format!("Failed to open history database {}", path.display()))?;
        info!("💾 Evaluation history: {} ({} stored)", path.display(), opened.count());
        monitor = monitor.with_sink(Box::new(HistorySink::new(opened.clone())));
        history = Some(opened);
    }

    if let Some(at) = args.at.as_deref() {
        let at = parse_time(at)?;
        let outcomes = monitor.tick(at).await;
        let warnings = outcomes.iter().filter(|o| o.fill_rate_warning()).count();
        info!("✓ Evaluated {} tank(s) at {} ({} fill-rate warning(s))", outcomes.len(), at, warnings);
        flush_history(history.as_ref())?;
        return Ok(());
    }

    if let Some(start) = args.replay_from.as_deref() {
        let start = parse_time(start)?;
        let step_secs = args.step_secs.unwrap_or(config.schedule.interval_secs);
        let step = chrono::Duration::seconds(
            i64::try_from(step_secs).context("Replay step is too large")?,
        );
        info!("⏱️  Replay from {} in {}s steps", start, step_secs);
        monitor = monitor
            .with_replay(start, step)
            .with_period(Duration::from_millis(args.pace_ms));

        // Without an explicit limit, replay stops at the last historized sample
        if args.ticks.is_none() {
            if let Some(end) = history_end.filter(|end| *end >= start) {
                let span = u64::try_from((end - start).num_seconds()).unwrap_or(0);
                monitor = monitor.with_max_ticks(span / step_secs.max(1) + 1);
            }
        }
    }
    if let Some(ticks) = args.ticks {
        monitor = monitor.with_max_ticks(ticks);
    }

    let stats = monitor.run().await;
    if stats.errors > 0 {
        warn!("{} evaluation(s) made no selection", stats.errors);
    }
    flush_history(history.as_ref())?;

    info!("✓ LevelWatch shutdown complete");
    Ok(())
}
