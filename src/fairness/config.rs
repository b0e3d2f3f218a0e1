use serde::{Deserialize, Serialize};

/// Bias detection thresholds. An attribute is flagged when any one trips.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FairnessThresholds {
    /// Maximum tolerated (maxMean - minMean) / avgMean.
    #[serde(default = "default_parity")]
    pub parity_ratio: f64,

    #[serde(default = "default_p_value")]
    pub p_value: f64,

    /// Maximum tolerated |Cohen's d|.
    #[serde(default = "default_cohen_d")]
    pub cohen_d: f64,
}

fn default_parity() -> f64 {
    0.1
}

fn default_p_value() -> f64 {
    0.05
}

fn default_cohen_d() -> f64 {
    0.2
}

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self {
            parity_ratio: default_parity(),
            p_value: default_p_value(),
            cohen_d: default_cohen_d(),
        }
    }
}

/// Fairness audit settings.
///
/// Example YAML:
/// ```yaml
/// fairness:
///   thresholds:
///     parity_ratio: 0.1
///     p_value: 0.05
///     cohen_d: 0.2
///   protected_attributes: [gender, age_band, department]
///   intersectional: [gender, age_band]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FairnessConfig {
    #[serde(default)]
    pub thresholds: FairnessThresholds,

    /// Attributes audited when a caller does not name any.
    #[serde(default = "default_protected")]
    pub protected_attributes: Vec<String>,

    /// Attributes crossed for the intersectional pass (needs at least two).
    #[serde(default = "default_intersectional")]
    pub intersectional: Vec<String>,
}

fn default_protected() -> Vec<String> {
    ["gender", "age_band", "department", "job_level"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_intersectional() -> Vec<String> {
    ["gender", "age_band"].into_iter().map(String::from).collect()
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            thresholds: FairnessThresholds::default(),
            protected_attributes: default_protected(),
            intersectional: default_intersectional(),
        }
    }
}

pub fn validate_fairness(config: &FairnessConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let t = &config.thresholds;

    if !(t.parity_ratio > 0.0 && t.parity_ratio.is_finite()) {
        errors.push(format!(
            "fairness.thresholds.parity_ratio: {} must be a positive number",
            t.parity_ratio
        ));
    }
    if !(t.p_value > 0.0 && t.p_value < 1.0) {
        errors.push(format!(
            "fairness.thresholds.p_value: {} must be between 0 and 1 (exclusive)",
            t.p_value
        ));
    }
    if !(t.cohen_d > 0.0 && t.cohen_d.is_finite()) {
        errors.push(format!(
            "fairness.thresholds.cohen_d: {} must be a positive number",
            t.cohen_d
        ));
    }
    if config.protected_attributes.iter().any(|a| a.trim().is_empty()) {
        errors.push("fairness.protected_attributes: names must not be empty".to_string());
    }
    if config.intersectional.len() == 1 {
        errors.push(format!(
            "fairness.intersectional: needs at least two attributes, got '{}'",
            config.intersectional[0]
        ));
    }

    errors
}
