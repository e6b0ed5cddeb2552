//! Window Sampler - current and hour-ago windows for one sensor
//!
//! For evaluation time T and the default geometry:
//! - `now_avg`, `now_std` over `[T-6min, T]`
//! - `lag_avg` over `[T-66min, T-60min]`
//!
//! Every query is bounded by the configured timeout. A failed, empty, or
//! timed-out query yields [`SensorReading::NoData`] for that sensor, never a
//! numeric default.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::HistorianConfig;
use crate::historian::{Historian, HistorianError};
use crate::types::{SensorReading, SensorSample};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("no data for tag '{tag}': {source}")]
pub struct SamplingError {
    pub tag: String,
    #[source]
    pub source: HistorianError,
}

/// Issues the windowed historian queries for a sensor at a given tick
#[derive(Clone)]
pub struct WindowSampler {
    historian: Arc<dyn Historian>,
    current_window: chrono::Duration,
    lag_offset: chrono::Duration,
    lag_window: chrono::Duration,
    timeout: Duration,
}

impl WindowSampler {
    pub fn new(historian: Arc<dyn Historian>, config: &HistorianConfig) -> Self {
        Self {
            historian,
            current_window: config.current_window(),
            lag_offset: config.lag_offset(),
            lag_window: config.lag_window(),
            timeout: config.query_timeout(),
        }
    }

    pub fn historian_name(&self) -> &str {
        self.historian.name()
    }

    /// Current window `[T - current_window, T]`, or `None` when the start
    /// precedes the earliest representable time
    pub fn current_bounds(&self, at: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((at.checked_sub_signed(self.current_window)?, at))
    }

    /// Lagged window `[T - lag_offset - lag_window, T - lag_offset]`
    pub fn lagged_bounds(&self, at: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let end = at.checked_sub_signed(self.lag_offset)?;
        Some((end.checked_sub_signed(self.lag_window)?, end))
    }

    /// Sample one sensor. The current and lagged queries run concurrently;
    /// the sample is missing if either of them fails.
    pub async fn sample(&self, tag: &str, at: DateTime<Utc>) -> Result<SensorSample, SamplingError> {
        let bounds = self.current_bounds(at).zip(self.lagged_bounds(at));
        let Some(((now_start, now_end), (lag_start, lag_end))) = bounds else {
            return Err(SamplingError {
                tag: tag.to_string(),
                source: HistorianError::OutOfRange {
                    tag: tag.to_string(),
                    at,
                },
            });
        };

        let current = self.bounded(tag, self.historian.window_statistics(tag, now_start, now_end));
        let lagged = self.bounded(tag, self.historian.window_average(tag, lag_start, lag_end));

        let (now, lag_avg) = tokio::try_join!(current, lagged).map_err(|source| SamplingError {
            tag: tag.to_string(),
            source,
        })?;

        Ok(SensorSample::new(tag, now.mean, now.std_dev, lag_avg))
    }

    /// Sample both sensors of a tank at the same T.
    ///
    /// Both readings come from one tick; a failure on one sensor does not
    /// cancel the other's queries.
    pub async fn sample_pair(
        &self,
        sensor1_tag: &str,
        sensor2_tag: &str,
        at: DateTime<Utc>,
    ) -> (SensorReading, SensorReading) {
        let (first, second) =
            tokio::join!(self.sample(sensor1_tag, at), self.sample(sensor2_tag, at));
        (Self::into_reading(first), Self::into_reading(second))
    }

    fn into_reading(result: Result<SensorSample, SamplingError>) -> SensorReading {
        match result {
            Ok(sample) => SensorReading::Available(sample),
            Err(e) => {
                tracing::warn!(tag = %e.tag, error = %e.source, "Sensor has no data this tick");
                SensorReading::NoData {
                    tag: e.tag,
                    reason: e.source.to_string(),
                }
            }
        }
    }

    async fn bounded<T, F>(&self, tag: &str, query: F) -> Result<T, HistorianError>
    where
        F: Future<Output = Result<T, HistorianError>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(HistorianError::Timeout {
                tag: tag.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
