//! Sensor identity and per-tick window samples

use serde::{Deserialize, Serialize};

use crate::config::defaults::ABSENT_SENSOR_READING;

// ============================================================================
// Sensor Identity
// ============================================================================

/// One of the two redundant level transmitters mounted on a tank
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    Sensor1,
    Sensor2,
}

impl SensorId {
    /// Both sensors in evaluation order
    pub const BOTH: [Self; 2] = [Self::Sensor1, Self::Sensor2];

    /// The redundant partner of this sensor
    pub const fn other(self) -> Self {
        match self {
            Self::Sensor1 => Self::Sensor2,
            Self::Sensor2 => Self::Sensor1,
        }
    }

    /// Zero-based slot index, used for per-sensor arrays
    pub const fn index(self) -> usize {
        match self {
            Self::Sensor1 => 0,
            Self::Sensor2 => 1,
        }
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorId::Sensor1 => write!(f, "sensor1"),
            SensorId::Sensor2 => write!(f, "sensor2"),
        }
    }
}

// ============================================================================
// Historian Window Statistics
// ============================================================================

/// Mean and standard deviation of a tag over one window, as reported by the historian
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowStatistics {
    pub mean: f64,
    pub std_dev: f64,
    /// Number of raw samples the historian aggregated
    pub count: usize,
}

// ============================================================================
// Sensor Sample
// ============================================================================

/// Windowed statistics for one sensor at one evaluation tick.
///
/// Levels are in percent of span. Built fresh every tick and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorSample {
    /// Historian tag the statistics were queried from
    pub tag: String,
    /// Average over the current window `[T-6min, T]`
    pub now_avg: f64,
    /// Standard deviation over the current window
    pub now_std: f64,
    /// Average over the lagged window `[T-66min, T-60min]`
    pub lag_avg: f64,
}

impl SensorSample {
    pub fn new(tag: impl Into<String>, now_avg: f64, now_std: f64, lag_avg: f64) -> Self {
        Self {
            tag: tag.into(),
            now_avg,
            now_std,
            lag_avg,
        }
    }

    /// Legacy site convention: a current reading of exactly zero means the
    /// transmitter is not installed or not wired. This is not a data-quality check.
    #[allow(clippy::float_cmp)]
    pub fn is_absent(&self) -> bool {
        self.now_avg == ABSENT_SENSOR_READING
    }

    /// Rise in level between the lagged window and the current window
    pub fn fill_rate(&self) -> f64 {
        self.now_avg - self.lag_avg
    }

    /// Magnitude of movement between the lagged window and the current window
    pub fn historical_delta(&self) -> f64 {
        self.fill_rate().abs()
    }
}

/// What the window sampler produced for one sensor at one tick.
///
/// `NoData` is kept distinct from a numeric reading so that a failed or empty
/// historian query is never confused with a valid 0.0 level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensorReading {
    Available(SensorSample),
    NoData { tag: String, reason: String },
}

impl SensorReading {
    pub fn sample(&self) -> Option<&SensorSample> {
        match self {
            SensorReading::Available(sample) => Some(sample),
            SensorReading::NoData { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SensorReading::Available(_))
    }
}

impl From<SensorSample> for SensorReading {
    fn from(sample: SensorSample) -> Self {
        SensorReading::Available(sample)
    }
}
