//! LevelWatch: redundant tank level sensor arbitration
//!
//! Picks, for every tank, the one of two redundant level sensors whose reading
//! can currently be trusted, and raises a fill-rate warning when the trusted
//! reading rises faster than the tank's configured maximum.
//!
//! ## Architecture
//!
//! - **Historian**: windowed averages and standard deviations per tag
//! - **Window Sampler**: current and hour-ago windows for both sensors
//! - **Rule Engine**: fault classification, sensor selection, fill-rate check
//! - **Monitor Loop**: scheduler tick, alarm sinks, evaluation history

pub mod acquisition;
pub mod config;
pub mod engine;
pub mod historian;
pub mod history_storage;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::{MonitorConfig, RuleThresholds, TankConfig};

// Re-export commonly used types
pub use types::{
    FaultReason, FaultReport, FaultSuspicion, FillRateStatus, RuleAmbiguity, SelectionDecision,
    SelectionReason, SensorId, SensorReading, SensorSample, TankOutcome, TankReport,
};

// Re-export the rule engine
pub use engine::{evaluate, Evaluation, EvaluationError, MaxFillRate};

// Re-export historian and sampling
pub use acquisition::{SamplingError, WindowSampler};
pub use historian::{Historian, HistorianError, MemoryHistorian};

// Re-export pipeline
pub use pipeline::{AlarmSink, MonitorLoop, MonitorStats, TankEvaluator};

// Re-export storage
pub use history_storage::{EvaluationHistory, StorageError};
