//! Historian data ingestion from CSV files
//!
//! Expected format, one raw sample per line:
//! `timestamp,tag,value`
//!
//! The timestamp is RFC 3339 (`2024-05-01T12:00:00Z`) or Unix epoch seconds.
//! A leading `timestamp` header line is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::MemoryHistorian;

/// Load a CSV file into a [`MemoryHistorian`].
///
/// Malformed lines are logged and skipped; only an unreadable file is an error.
pub fn load_csv(path: &Path) -> Result<MemoryHistorian> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open historian CSV {}", path.display()))?;
    let historian = read_csv(BufReader::new(file), "csv")?;
    tracing::info!(
        path = %path.display(),
        tags = historian.tag_count(),
        samples = historian.sample_count(),
        "Loaded historian samples from CSV"
    );
    Ok(historian)
}

/// Read CSV samples from any reader.
pub fn read_csv<R: Read>(reader: R, name: &str) -> Result<MemoryHistorian> {
    let mut historian = MemoryHistorian::named(name);

    for (idx, line_result) in BufReader::new(reader).lines().enumerate() {
        let line_num = idx + 1;
        let line = line_result.with_context(|| format!("Error reading CSV line {line_num}"))?;

        if line.trim().is_empty() || (line_num == 1 && line.starts_with("timestamp")) {
            continue;
        }

        match parse_csv_line(&line, line_num) {
            Ok((timestamp, tag, value)) => historian.insert(tag, timestamp, value),
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error parsing CSV line");
            }
        }
    }

    Ok(historian)
}

/// Parse a single CSV line into `(timestamp, tag, value)`
fn parse_csv_line(line: &str, line_num: usize) -> Result<(DateTime<Utc>, &str, f64), String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(format!(
            "Expected 3 fields, got {} on line {}",
            fields.len(),
            line_num
        ));
    }

    let timestamp = parse_timestamp(fields[0])?;
    let tag = fields[1];
    if tag.is_empty() {
        return Err(format!("Empty tag on line {line_num}"));
    }
    let value: f64 = fields[2]
        .parse()
        .map_err(|e| format!("Invalid value '{}': {}", fields[2], e))?;
    if !value.is_finite() {
        return Err(format!("Non-finite value '{}' on line {}", fields[2], line_num));
    }

    Ok((timestamp, tag, value))
}

/// Parse RFC 3339 or Unix epoch seconds
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| format!("Timestamp out of range: {s}"));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{s}': {e}"))
}
