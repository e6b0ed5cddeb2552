//! Historian query interface
//!
//! The historian owns tag history and its statistics engine. The monitor only
//! asks it for windowed averages and standard deviations, through the
//! [`Historian`] trait, so a plant historian client and the in-memory store
//! used for replay and tests are interchangeable.

pub mod csv;
pub mod memory;

pub use memory::MemoryHistorian;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::WindowStatistics;

/// Why a historian query produced no usable value.
///
/// Every variant is distinct from a valid 0.0 reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistorianError {
    #[error("no samples for tag '{tag}' between {start} and {end}")]
    NoData {
        tag: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    #[error("historian unavailable: {0}")]
    Unavailable(String),

    #[error("query for tag '{tag}' timed out after {timeout_ms} ms")]
    Timeout { tag: String, timeout_ms: u64 },

    #[error("window for tag '{tag}' at {at} falls outside the representable time range")]
    OutOfRange { tag: String, at: DateTime<Utc> },

    #[error("tag '{tag}' returned a non-finite value ({value})")]
    InvalidValue { tag: String, value: f64 },
}

/// Trait abstracting where windowed tag statistics come from.
///
/// Windows are closed intervals `[start, end]`. Implementations should return
/// `NoData` for an empty window rather than a numeric default.
#[async_trait]
pub trait Historian: Send + Sync {
    /// Average of `tag` over `[start, end]`.
    async fn window_average(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, HistorianError>;

    /// Mean and standard deviation of `tag` over `[start, end]`.
    async fn window_statistics(
        &self,
        tag: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WindowStatistics, HistorianError>;

    /// Human-readable name for logging (e.g. "memory", "csv").
    fn name(&self) -> &str;
}
