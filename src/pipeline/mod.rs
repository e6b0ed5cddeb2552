//! Monitoring Pipeline Module
//!
//! ## Per-Tick Flow
//!
//! ```text
//! Scheduler tick at T
//!   -> TankEvaluator (one per tank, concurrently)
//!        WindowSampler: current + lagged windows for both sensors
//!        engine::evaluate: classify -> select -> fill-rate check
//!   -> TankOutcome
//!   -> AlarmSinks (log, JSON lines, evaluation history)
//! ```
//!
//! No state crosses ticks. Each tick's outcome depends only on the
//! historian's answers for that T.

mod evaluator;
pub mod processing_loop;
pub mod sink;

pub use evaluator::TankEvaluator;
pub use processing_loop::{MonitorLoop, MonitorStats, TickClock};
pub use sink::{AlarmSink, HistorySink, JsonLinesSink, LogSink, SinkError};
