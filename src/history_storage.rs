//! History Storage Module
//!
//! Persists successful tank evaluations so a tick's selection and fill-rate
//! decision can be inspected after the fact.

use crate::types::TankReport;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    DatabaseError(String),
    SerializationError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            StorageError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Evaluation history for all tanks
///
/// Key: tank name, `/`, then the evaluation time in Unix milliseconds as
/// u64 big-endian bytes, so each tank's entries sort chronologically.
/// Value: JSON-serialized `TankReport`.
#[derive(Clone)]
pub struct EvaluationHistory {
    db: Arc<sled::Db>,
}

impl EvaluationHistory {
    /// Open or create the history storage at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a tank report, replacing any earlier report for the same tank and tick.
    ///
    /// Does not flush on each write; sled flushes in the background.
    pub fn store_report(&self, report: &TankReport) -> Result<(), StorageError> {
        let key = Self::key(&report.tank, report.evaluated_at);
        let value = serde_json::to_vec(report)?;
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Most recent `limit` reports for a tank (newest first)
    pub fn recent(&self, tank: &str, limit: usize) -> Vec<TankReport> {
        let prefix = Self::prefix(tank);
        let mut reports = Vec::with_capacity(limit);

        for item in self.db.scan_prefix(&prefix).rev() {
            if reports.len() >= limit {
                break;
            }
            if let Some(report) = Self::decode(&prefix, item) {
                reports.push(report);
            }
        }

        reports
    }

    /// All reports for a tank evaluated within `[start, end]` (oldest first)
    pub fn range(&self, tank: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TankReport> {
        let prefix = Self::prefix(tank);
        let start_key = Self::key(tank, start);
        let end_key = Self::key(tank, end);

        self.db
            .range(start_key..=end_key)
            .filter_map(|item| Self::decode(&prefix, item))
            .collect()
    }

    /// Total number of stored reports across all tanks
    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Clear all reports
    pub fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    fn prefix(tank: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(tank.len() + 1);
        prefix.extend_from_slice(tank.as_bytes());
        prefix.push(b'/');
        prefix
    }

    fn key(tank: &str, at: DateTime<Utc>) -> Vec<u8> {
        // Pre-epoch times clamp to zero
        let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        let mut key = Self::prefix(tank);
        key.extend_from_slice(&millis.to_be_bytes());
        key
    }

    /// Decode an entry belonging to exactly this tank.
    ///
    /// A tank named `a/b` shares the `a/` prefix with tank `a`, so the key
    /// length is checked too.
    fn decode(prefix: &[u8], item: sled::Result<(sled::IVec, sled::IVec)>) -> Option<TankReport> {
        let (key, value) = item.ok()?;
        if key.len() != prefix.len() + 8 || !key.starts_with(prefix) {
            return None;
        }
        serde_json::from_slice::<TankReport>(&value).ok()
    }
}
