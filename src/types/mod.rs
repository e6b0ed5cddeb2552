//! Shared data structures for tank level sensor arbitration
//!
//! This module defines the records that flow through one evaluation tick:
//! - Sampling: SensorSample, SensorReading (window statistics per sensor)
//! - Classification: FaultReason, FaultSuspicion, FaultReport
//! - Selection: SelectionDecision, SelectionReason
//! - Output: FillRateStatus, TankReport, TankOutcome

mod sample;
mod fault;
mod selection;
mod report;

pub use sample::*;
pub use fault::*;
pub use selection::*;
pub use report::*;
