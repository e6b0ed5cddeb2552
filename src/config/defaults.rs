//! System-wide default constants.
//!
//! Centralises the rule thresholds and window geometry used when the TOML
//! file leaves a value unset. Grouped by subsystem for easy discovery.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LEVELWATCH_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "levelwatch.toml";

// ============================================================================
// Scheduler
// ============================================================================

/// Seconds between evaluation ticks.
pub const TICK_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Historian Windows
// ============================================================================

/// Length of the current window `[T-6min, T]` (seconds).
pub const CURRENT_WINDOW_SECS: i64 = 360;

/// Offset of the lagged window's end from T (seconds). 3 600 = 1 hour.
pub const LAG_OFFSET_SECS: i64 = 3_600;

/// Length of the lagged window `[T-66min, T-60min]` (seconds).
pub const LAG_WINDOW_SECS: i64 = 360;

/// Upper bound on any window length or offset (seconds). 604 800 = 1 week.
pub const MAX_WINDOW_SECS: i64 = 604_800;

/// Per-query historian timeout (ms). A timed-out query counts as missing data.
pub const QUERY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Rule Thresholds
// ============================================================================

/// Absolute disagreement between the two current averages (percentage points).
pub const DISAGREEMENT_PCT: f64 = 5.0;

/// Noise threshold on current-window std, as a fraction of Max_Fill_Rate.
pub const NOISE_FRACTION: f64 = 0.12;

/// Cross-sensor variance threshold for the stuck rule, fraction of Max_Fill_Rate.
pub const VARIANCE_FRACTION: f64 = 0.05;

/// Hour-over-hour delta threshold for the stuck rule, fraction of Max_Fill_Rate.
pub const DELTA_FRACTION: f64 = 0.10;

/// Lowest plausible level reading (percent of span).
pub const RANGE_MIN_PCT: f64 = 3.0;

/// Highest plausible level reading (percent of span).
pub const RANGE_MAX_PCT: f64 = 98.0;

/// Current reading that marks a transmitter as not installed.
pub const ABSENT_SENSOR_READING: f64 = 0.0;
