//! In-memory historian backed by time-ordered samples per tag

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;

use super::{Historian, HistorianError};
use crate::types::WindowStatistics;

/// Historian that keeps raw samples in memory and computes window statistics
/// on demand. Used for CSV replay, simulation, and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistorian {
    name: String,
    /// Samples per tag, kept sorted by timestamp
    tags: HashMap<String, Vec<(DateTime<Utc>, f64)>>,
}

impl MemoryHistorian {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    /// Record one raw sample. Out-of-order inserts are placed in time order.
    pub fn insert(&mut self, tag: &str, timestamp: DateTime<Utc>, value: f64) {
        let series = self.tags.entry(tag.to_string()).or_default();
        let pos = series.partition_point(|(ts, _)| *ts <= timestamp);
        series.insert(pos, (timestamp, value));
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn sample_count(&self) -> usize {
        self.tags.values().map(Vec::len).sum()
    }

    /// Earliest and latest timestamps across all tags
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.tags.values().filter_map(|s| s.first().map(|(ts, _)| *ts)).min()?;
        let last = self.tags.values().filter_map(|s| s.last().map(|(ts, _)| *ts)).max()?;
        Some((first, last))
    }

    fn window(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<f64>, HistorianError> {
        let series = self
            .tags
            .get(tag)
            .ok_or_else(|| HistorianError::UnknownTag(tag.to_string()))?;

        let lo = series.partition_point(|(ts, _)| *ts < start);
        let hi = series.partition_point(|(ts, _)| *ts <= end);
        if lo >= hi {
            return Err(HistorianError::NoData {
                tag: tag.to_string(),
                start,
                end,
            });
        }
        Ok(series[lo..hi].iter().map(|(_, v)| *v).collect())
    }

    fn statistics(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WindowStatistics, HistorianError> {
        let values = self.window(tag, start, end)?;
        let count = values.len();
        let mean = values.iter().mean();
        // Sample std dev is undefined for a single point; report it as flat
        let std_dev = if count < 2 { 0.0 } else { values.iter().std_dev() };

        for value in [mean, std_dev] {
            if !value.is_finite() {
                return Err(HistorianError::InvalidValue {
                    tag: tag.to_string(),
                    value,
                });
            }
        }
        Ok(WindowStatistics {
            mean,
            std_dev,
            count,
        })
    }
}

#[async_trait]
impl Historian for MemoryHistorian {
    async fn window_average(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, HistorianError> {
        self.statistics(tag, start, end).map(|s| s.mean)
    }

    async fn window_statistics(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WindowStatistics, HistorianError> {
        self.statistics(tag, start, end)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn historian_with(values: &[f64]) -> MemoryHistorian {
        let mut h = MemoryHistorian::new();
        for (i, v) in values.iter().enumerate() {
            h.insert("LT1", t0() + Duration::seconds(i as i64 * 60), *v);
        }
        h
    }

    #[tokio::test]
    async fn test_window_statistics_mean_and_sample_std() {
        let h = historian_with(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = h
            .window_statistics("LT1", t0(), t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // Sample (n-1) standard deviation of the classic population-2.0 series
        assert!((stats.std_dev - 2.138_089_935_299_395).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let h = historian_with(&[10.0, 20.0, 30.0]);
        let avg = h
            .window_average("LT1", t0() + Duration::seconds(60), t0() + Duration::seconds(120))
            .await
            .unwrap();
        assert!((avg - 25.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_window_is_no_data_not_zero() {
        let h = historian_with(&[0.0]);
        let err = h
            .window_average("LT1", t0() + Duration::hours(2), t0() + Duration::hours(3))
            .await
            .unwrap_err();
        assert!(matches!(err, HistorianError::NoData { .. }));

        // A genuine zero reading is still a value
        let zero = h.window_average("LT1", t0(), t0()).await.unwrap();
        assert_eq!(zero, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let h = historian_with(&[1.0]);
        let err = h.window_average("LT9", t0(), t0()).await.unwrap_err();
        assert_eq!(err, HistorianError::UnknownTag("LT9".to_string()));
    }

    #[tokio::test]
    async fn test_single_sample_window_has_zero_std() {
        let h = historian_with(&[42.0]);
        let stats = h.window_statistics("LT1", t0(), t0()).await.unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 42.0);
    }

    #[test]
    fn test_out_of_order_insert_is_sorted() {
        let mut h = MemoryHistorian::new();
        h.insert("LT1", t0() + Duration::seconds(120), 3.0);
        h.insert("LT1", t0(), 1.0);
        h.insert("LT1", t0() + Duration::seconds(60), 2.0);
        let (first, last) = h.time_span().unwrap();
        assert_eq!(first, t0());
        assert_eq!(last, t0() + Duration::seconds(120));
        assert_eq!(h.sample_count(), 3);
    }
}
