//! Sensor data acquisition module
//!
//! Pulls the historian windows each evaluation tick needs.

pub mod window_sampler;

pub use window_sampler::{SamplingError, WindowSampler};
