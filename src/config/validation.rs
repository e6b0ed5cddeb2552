//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks on tank and rule values.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MonitorConfig.
///
/// Entries of the `[[tanks]]` array share the `tanks.` prefix.
/// Any new field added to MonitorConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [site]
        "site",
        "site.name",
        // [schedule]
        "schedule",
        "schedule.interval_secs",
        // [historian]
        "historian",
        "historian.query_timeout_ms",
        "historian.current_window_secs",
        "historian.lag_offset_secs",
        "historian.lag_window_secs",
        // [rules]
        "rules",
        "rules.disagreement_pct",
        "rules.noise_fraction",
        "rules.variance_fraction",
        "rules.delta_fraction",
        "rules.range_min_pct",
        "rules.range_max_pct",
        // [[tanks]]
        "tanks",
        "tanks.name",
        "tanks.sensor1_tag",
        "tanks.sensor2_tag",
        "tanks.max_fill_rate",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
/// Tables inside arrays are walked under the array's own key, so
/// `[[tanks]] name = "x"` yields `["tanks", "tanks.name"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(items) => {
                    for item in items.iter().filter(|i| i.is_table()) {
                        keys.extend(walk_toml_keys(item, &path));
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        // Ties break alphabetically so suggestions do not depend on hash order
        let better = match best {
            None => true,
            Some((best_key, best_dist)) => dist < best_dist || (dist == best_dist && k < best_key),
        };
        if better {
            best = Some((k, dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if known.contains(key.as_str()) || !seen.insert(key.clone()) {
            continue;
        }
        let suggestion = suggest_correction(&key, &known);
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            field: key,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Plausibility Validation
// ============================================================================

/// Validate value ranges on a parsed MonitorConfig.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::MonitorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let r = &config.rules;

    // Levels are percent of span
    if r.range_min_pct < 0.0 {
        errors.push(format!(
            "rules.range_min_pct = {:.1} is below 0% of span",
            r.range_min_pct
        ));
    }
    if r.range_max_pct > 100.0 {
        errors.push(format!(
            "rules.range_max_pct = {:.1} is above 100% of span",
            r.range_max_pct
        ));
    }

    for (field, value) in [
        ("rules.noise_fraction", r.noise_fraction),
        ("rules.variance_fraction", r.variance_fraction),
        ("rules.delta_fraction", r.delta_fraction),
    ] {
        if value > 1.0 {
            warnings.push(ValidationWarning {
                field: field.to_string(),
                message: format!("{field} = {value:.3} exceeds Max_Fill_Rate itself (> 1.0)"),
                suggestion: None,
            });
        }
    }

    if r.disagreement_pct > 50.0 {
        warnings.push(ValidationWarning {
            field: "rules.disagreement_pct".to_string(),
            message: format!(
                "disagreement_pct = {:.1} is above half the span; gated rules will rarely run",
                r.disagreement_pct
            ),
            suggestion: None,
        });
    }

    // Ticks further apart than the current window leave unevaluated gaps
    let interval = i64::try_from(config.schedule.interval_secs).unwrap_or(i64::MAX);
    if interval > config.historian.current_window_secs {
        warnings.push(ValidationWarning {
            field: "schedule.interval_secs".to_string(),
            message: format!(
                "schedule.interval_secs = {} exceeds historian.current_window_secs = {}",
                config.schedule.interval_secs, config.historian.current_window_secs
            ),
            suggestion: None,
        });
    }

    for tank in &config.tanks {
        match tank.max_fill_rate {
            None => warnings.push(ValidationWarning {
                field: format!("tanks.{}.max_fill_rate", tank.name),
                message: format!(
                    "tank '{}' has no max_fill_rate; it will not be evaluated",
                    tank.name
                ),
                suggestion: None,
            }),
            Some(rate) if !rate.is_finite() || rate <= 0.0 => warnings.push(ValidationWarning {
                field: format!("tanks.{}.max_fill_rate", tank.name),
                message: format!(
                    "tank '{}' max_fill_rate = {rate} is not positive; it will not be evaluated",
                    tank.name
                ),
                suggestion: None,
            }),
            Some(rate) if rate > 100.0 => warnings.push(ValidationWarning {
                field: format!("tanks.{}.max_fill_rate", tank.name),
                message: format!(
                    "tank '{}' max_fill_rate = {rate:.1} exceeds the full span per hour",
                    tank.name
                ),
                suggestion: None,
            }),
            Some(_) => {}
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonitorConfig, TankConfig};

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("noise_fracton", "noise_fraction"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [rules]
            noise_fraction = 0.12
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"rules".to_string()));
        assert!(keys.contains(&"rules.noise_fraction".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_array_of_tables() {
        let toml: toml::Value = r#"
            [[tanks]]
            name = "TK-1"
            [[tanks]]
            name = "TK-2"
            max_fill_rate = 10.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"tanks".to_string()));
        assert!(keys.contains(&"tanks.name".to_string()));
        assert!(keys.contains(&"tanks.max_fill_rate".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[rules]
noise_fracton = 0.12
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("noise_fracton"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("rules.noise_fraction"));
    }

    #[test]
    fn test_typo_repeated_across_tanks_warns_once() {
        let toml_str = r#"
[[tanks]]
name = "TK-1"
sensor1_tag = "A"
sensor2_tag = "B"
max_fill_rte = 10.0

[[tanks]]
name = "TK-2"
sensor1_tag = "C"
sensor2_tag = "D"
max_fill_rte = 10.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].suggestion.as_deref(), Some("tanks.max_fill_rate"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_range_bounds_outside_span_are_errors() {
        let mut config = MonitorConfig::default();
        config.rules.range_min_pct = -1.0;
        config.rules.range_max_pct = 101.0;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_missing_max_fill_rate_warns() {
        let mut config = MonitorConfig::default();
        config.tanks.push(TankConfig::new("TK-9", "A", "B", None));
        config.tanks.push(TankConfig::new("TK-10", "C", "D", Some(-4.0)));
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "tanks.TK-9.max_fill_rate"));
        assert!(warnings.iter().any(|w| w.field == "tanks.TK-10.max_fill_rate"));
    }

    #[test]
    fn test_defaults_clean() {
        let (errors, warnings) = validate_ranges(&MonitorConfig::default());
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }
}
