//! Monitor Configuration Module
//!
//! Provides site and per-tank configuration loaded from TOML files, with every
//! rule threshold exposed as an operator-tunable value.
//!
//! ## Loading Order
//!
//! 1. `LEVELWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `levelwatch.toml` in the current working directory
//! 3. Built-in defaults (no tanks configured)
//!
//! ## Usage
//!
//! ```ignore
//! let config = MonitorConfig::load();
//! let noise = config.rules.noise_threshold(20.0);
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
