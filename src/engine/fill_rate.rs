//! Fill-Rate Monitor - hour-over-hour rise on the active sensor

use super::MaxFillRate;
use crate::types::{FillRateStatus, SensorId, SensorSample};

/// Compare the active sensor's rise since the lagged window against Max_Fill_Rate.
///
/// The warning is inclusive: a rise equal to the maximum raises it.
pub fn check_fill_rate(active: SensorId, sample: &SensorSample, max_fill_rate: MaxFillRate) -> FillRateStatus {
    let rate = sample.fill_rate();
    let max = max_fill_rate.value();
    FillRateStatus {
        sensor: active,
        rate,
        max_fill_rate: max,
        warning: rate >= max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mfr(v: f64) -> MaxFillRate {
        MaxFillRate::new(Some(v)).unwrap()
    }

    #[test]
    fn test_rate_above_max_warns() {
        let sample = SensorSample::new("LT1", 80.0, 0.5, 50.0);
        let status = check_fill_rate(SensorId::Sensor1, &sample, mfr(25.0));
        assert_eq!(status.rate, 30.0);
        assert!(status.warning);
    }

    #[test]
    fn test_rate_equal_to_max_warns() {
        let sample = SensorSample::new("LT1", 45.0, 0.5, 25.0);
        assert!(check_fill_rate(SensorId::Sensor1, &sample, mfr(20.0)).warning);
    }

    #[test]
    fn test_draining_tank_never_warns() {
        let sample = SensorSample::new("LT2", 20.0, 0.5, 80.0);
        let status = check_fill_rate(SensorId::Sensor2, &sample, mfr(25.0));
        assert!(status.rate < 0.0);
        assert!(!status.warning);
        assert_eq!(status.sensor, SensorId::Sensor2);
    }
}
