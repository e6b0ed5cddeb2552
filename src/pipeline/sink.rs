//! Alarm sinks: where each tank outcome goes after a tick
//!
//! Delivery beyond these sinks (email, alarm routing) belongs to external
//! systems. A sink failure is logged by the loop and never stops it.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::history_storage::{EvaluationHistory, StorageError};
use crate::types::TankOutcome;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize outcome: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("history write failed: {0}")]
    Storage(#[from] StorageError),
}

/// Receives every tank outcome, once per tank per tick
#[async_trait]
pub trait AlarmSink: Send + Sync {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError>;

    /// Short name for log lines
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: AlarmSink + ?Sized> AlarmSink for Arc<S> {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError> {
        (**self).publish(outcome).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Log Sink
// ============================================================================

/// Writes each outcome to the tracing output
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlarmSink for LogSink {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError> {
        match outcome {
            TankOutcome::Evaluated(report) => {
                let status = &report.fill_rate;
                if status.warning {
                    warn!(
                        tank = %report.tank,
                        sensor = %status.sensor,
                        "⚠️  FILL RATE WARNING: {:.2}/h >= max {:.2}/h",
                        status.rate,
                        status.max_fill_rate
                    );
                } else {
                    info!(
                        tank = %report.tank,
                        active = %report.selection.active_sensor,
                        reason = %report.selection.reason,
                        "Fill rate {:.2}/h (max {:.2}/h)",
                        status.rate,
                        status.max_fill_rate
                    );
                }
            }
            TankOutcome::Failed { tank, error, .. } => {
                warn!(tank = %tank, "Evaluation failed: {}", error);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

// ============================================================================
// JSON Lines Sink
// ============================================================================

/// One JSON object per outcome, newline separated
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> AlarmSink for JsonLinesSink<W> {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError> {
        let line = serde_json::to_string(outcome)?;
        let mut writer = self.writer.lock().await;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

// ============================================================================
// History Sink
// ============================================================================

/// Persists successful evaluations; failed ones carry no report to store
#[derive(Clone)]
pub struct HistorySink {
    history: EvaluationHistory,
}

impl HistorySink {
    pub fn new(history: EvaluationHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &EvaluationHistory {
        &self.history
    }
}

#[async_trait]
impl AlarmSink for HistorySink {
    async fn publish(&self, outcome: &TankOutcome) -> Result<(), SinkError> {
        if let Some(report) = outcome.report() {
            self.history.store_report(report)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "history"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn failed() -> TankOutcome {
        TankOutcome::Failed {
            tank: "TK-9".to_string(),
            evaluated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            error: "configuration error: max_fill_rate is not configured".to_string(),
        }
    }

    #[tokio::test]
    async fn test_json_lines_one_object_per_outcome() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.publish(&failed()).await.unwrap();
        sink.publish(&failed()).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["tank"], "TK-9");
    }

    #[tokio::test]
    async fn test_history_sink_skips_failed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = HistorySink::new(EvaluationHistory::open(dir.path()).unwrap());
        sink.publish(&failed()).await.unwrap();
        assert_eq!(sink.history().count(), 0);
    }

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        assert!(LogSink.publish(&failed()).await.is_ok());
    }
}
