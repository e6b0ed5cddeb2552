//! Monitor Configuration - site, schedule, historian windows, rule thresholds, tanks
//!
//! Every threshold the rule engine uses is a field in this module. Each struct
//! implements `Default` with the documented rule values, so a config file only
//! needs to list the tanks.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a tank farm deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$LEVELWATCH_CONFIG` env var
/// 2. `./levelwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Site identification
    #[serde(default)]
    pub site: SiteInfo,

    /// Evaluation tick timing
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Historian window geometry and query timeout
    #[serde(default)]
    pub historian: HistorianConfig,

    /// Fault classification thresholds
    #[serde(default)]
    pub rules: RuleThresholds,

    /// Monitored tanks, each with two redundant level sensors
    #[serde(default)]
    pub tanks: Vec<TankConfig>,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$LEVELWATCH_CONFIG` environment variable
    /// 2. `./levelwatch.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), site = %config.site.name, "Loaded monitor config from LEVELWATCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from LEVELWATCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "LEVELWATCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(site = %config.site.name, "Loaded monitor config from ./levelwatch.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./levelwatch.toml, using defaults");
                }
            }
        }

        info!("No levelwatch.toml found, using built-in defaults with no tanks");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Monitor config saved");
        Ok(())
    }

    /// Look up a tank by name.
    pub fn tank(&self, name: &str) -> Option<&TankConfig> {
        self.tanks.iter().find(|t| t.name == name)
    }

    /// Validate thresholds and tank definitions for internal consistency.
    ///
    /// A missing or non-positive `max_fill_rate` is not an error
    /// here: it fails that tank's evaluation each tick and only warns at load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let r = &self.rules;
        Self::check_positive(r.noise_fraction, "rules.noise_fraction", &mut errors);
        Self::check_positive(r.variance_fraction, "rules.variance_fraction", &mut errors);
        Self::check_positive(r.delta_fraction, "rules.delta_fraction", &mut errors);
        if !r.disagreement_pct.is_finite() || r.disagreement_pct < 0.0 {
            errors.push(format!(
                "rules.disagreement_pct must be a finite value >= 0, got {}",
                r.disagreement_pct
            ));
        }
        if !r.range_min_pct.is_finite() || !r.range_max_pct.is_finite() {
            errors.push(format!(
                "rules.range: bounds must be finite (got min={}, max={})",
                r.range_min_pct, r.range_max_pct
            ));
        } else if r.range_min_pct >= r.range_max_pct {
            errors.push(format!(
                "rules.range_min_pct ({:.1}) must be less than range_max_pct ({:.1})",
                r.range_min_pct, r.range_max_pct
            ));
        }

        let h = &self.historian;
        Self::check_window(h.current_window_secs, "historian.current_window_secs", &mut errors);
        Self::check_window(h.lag_window_secs, "historian.lag_window_secs", &mut errors);
        Self::check_window(h.lag_offset_secs, "historian.lag_offset_secs", &mut errors);
        if h.lag_offset_secs < h.current_window_secs {
            errors.push(format!(
                "historian.lag_offset_secs ({}) must be >= current_window_secs ({})",
                h.lag_offset_secs, h.current_window_secs
            ));
        }
        if h.query_timeout_ms == 0 {
            errors.push("historian.query_timeout_ms must be > 0".to_string());
        }
        if self.schedule.interval_secs == 0 {
            errors.push("schedule.interval_secs must be > 0".to_string());
        }

        let mut seen = HashSet::new();
        for tank in &self.tanks {
            if tank.name.trim().is_empty() {
                errors.push("tanks: every tank needs a non-empty name".to_string());
                continue;
            }
            if !seen.insert(tank.name.as_str()) {
                errors.push(format!("tanks: duplicate tank name '{}'", tank.name));
            }
            if tank.sensor1_tag.trim().is_empty() || tank.sensor2_tag.trim().is_empty() {
                errors.push(format!("tanks.{}: sensor tags must be non-empty", tank.name));
            } else if tank.sensor1_tag == tank.sensor2_tag {
                errors.push(format!(
                    "tanks.{}: sensor1_tag and sensor2_tag must differ (both '{}')",
                    tank.name, tank.sensor1_tag
                ));
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so check finiteness first
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be a finite value > 0, got {value}"));
        }
    }

    fn check_window(secs: i64, name: &str, errors: &mut Vec<String>) {
        if secs <= 0 || secs > defaults::MAX_WINDOW_SECS {
            errors.push(format!(
                "{name} must be in 1..={}, got {secs}",
                defaults::MAX_WINDOW_SECS
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Site Info
// ============================================================================

/// Identification metadata; not used for logic, but appears in logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default = "default_site_name")]
    pub name: String,
}

fn default_site_name() -> String {
    "Unnamed Site".to_string()
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: default_site_name(),
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between evaluation ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    defaults::TICK_INTERVAL_SECS
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

// ============================================================================
// Historian Windows
// ============================================================================

/// Window geometry for the sampler, relative to the evaluation time T.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorianConfig {
    /// Per-query timeout (ms); a timeout counts as missing data
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Current window length: `[T - current_window, T]`
    #[serde(default = "default_current_window_secs")]
    pub current_window_secs: i64,

    /// Lagged window end offset: the window ends at `T - lag_offset`
    #[serde(default = "default_lag_offset_secs")]
    pub lag_offset_secs: i64,

    /// Lagged window length
    #[serde(default = "default_lag_window_secs")]
    pub lag_window_secs: i64,
}

fn default_query_timeout_ms() -> u64 {
    defaults::QUERY_TIMEOUT_MS
}

fn default_current_window_secs() -> i64 {
    defaults::CURRENT_WINDOW_SECS
}

fn default_lag_offset_secs() -> i64 {
    defaults::LAG_OFFSET_SECS
}

fn default_lag_window_secs() -> i64 {
    defaults::LAG_WINDOW_SECS
}

impl Default for HistorianConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout_ms(),
            current_window_secs: default_current_window_secs(),
            lag_offset_secs: default_lag_offset_secs(),
            lag_window_secs: default_lag_window_secs(),
        }
    }
}

impl HistorianConfig {
    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }

    pub fn current_window(&self) -> chrono::Duration {
        Self::window(self.current_window_secs)
    }

    pub fn lag_offset(&self) -> chrono::Duration {
        Self::window(self.lag_offset_secs)
    }

    pub fn lag_window(&self) -> chrono::Duration {
        Self::window(self.lag_window_secs)
    }

    /// Unvalidated values are clamped to `0..=MAX_WINDOW_SECS`
    fn window(secs: i64) -> chrono::Duration {
        chrono::Duration::seconds(secs.clamp(0, defaults::MAX_WINDOW_SECS))
    }
}

// ============================================================================
// Rule Thresholds
// ============================================================================

/// Fault classification thresholds.
///
/// Noise, variance and delta thresholds scale with each tank's Max_Fill_Rate.
/// Disagreement and range bounds are absolute percent-of-span values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleThresholds {
    /// Current averages further apart than this mean the sensors disagree (pp)
    #[serde(default = "default_disagreement_pct")]
    pub disagreement_pct: f64,

    /// Noise flag: now_std > noise_fraction × Max_Fill_Rate
    #[serde(default = "default_noise_fraction")]
    pub noise_fraction: f64,

    /// Stuck-by-variance threshold: variance_fraction × Max_Fill_Rate
    #[serde(default = "default_variance_fraction")]
    pub variance_fraction: f64,

    /// Stuck-by-delta threshold: delta_fraction × Max_Fill_Rate
    #[serde(default = "default_delta_fraction")]
    pub delta_fraction: f64,

    /// Lowest plausible current average (percent of span)
    #[serde(default = "default_range_min_pct")]
    pub range_min_pct: f64,

    /// Highest plausible current average (percent of span)
    #[serde(default = "default_range_max_pct")]
    pub range_max_pct: f64,
}

fn default_disagreement_pct() -> f64 {
    defaults::DISAGREEMENT_PCT
}

fn default_noise_fraction() -> f64 {
    defaults::NOISE_FRACTION
}

fn default_variance_fraction() -> f64 {
    defaults::VARIANCE_FRACTION
}

fn default_delta_fraction() -> f64 {
    defaults::DELTA_FRACTION
}

fn default_range_min_pct() -> f64 {
    defaults::RANGE_MIN_PCT
}

fn default_range_max_pct() -> f64 {
    defaults::RANGE_MAX_PCT
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            disagreement_pct: default_disagreement_pct(),
            noise_fraction: default_noise_fraction(),
            variance_fraction: default_variance_fraction(),
            delta_fraction: default_delta_fraction(),
            range_min_pct: default_range_min_pct(),
            range_max_pct: default_range_max_pct(),
        }
    }
}

impl RuleThresholds {
    pub fn noise_threshold(&self, max_fill_rate: f64) -> f64 {
        self.noise_fraction * max_fill_rate
    }

    pub fn variance_threshold(&self, max_fill_rate: f64) -> f64 {
        self.variance_fraction * max_fill_rate
    }

    pub fn delta_threshold(&self, max_fill_rate: f64) -> f64 {
        self.delta_fraction * max_fill_rate
    }

    /// Whether a current average lies inside the plausible span (inclusive)
    pub fn in_range(&self, level: f64) -> bool {
        (self.range_min_pct..=self.range_max_pct).contains(&level)
    }
}

// ============================================================================
// Tanks
// ============================================================================

/// One monitored tank and its two redundant level sensors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankConfig {
    pub name: String,
    pub sensor1_tag: String,
    pub sensor2_tag: String,
    /// Maximum acceptable level rise per hour (percent of span).
    /// Process-specific; evaluation fails for this tank when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fill_rate: Option<f64>,
}

impl TankConfig {
    pub fn new(
        name: impl Into<String>,
        sensor1_tag: impl Into<String>,
        sensor2_tag: impl Into<String>,
        max_fill_rate: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            sensor1_tag: sensor1_tag.into(),
            sensor2_tag: sensor2_tag.into(),
            max_fill_rate,
        }
    }
}
