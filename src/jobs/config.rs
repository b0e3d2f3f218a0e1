use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Job orchestration settings.
///
/// Example YAML:
/// ```yaml
/// jobs:
///   sample_size: 10
///   throttle: "100ms"
///   stale_after: "1h"
///   channel: analysis
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Records evaluated per job unless the caller overrides it.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Pause between records, bounding notification fan-out.
    #[serde(default = "default_throttle")]
    pub throttle: String,

    /// Age after which `sweep` treats an unfinished job as abandoned.
    #[serde(default = "default_stale_after")]
    pub stale_after: String,

    /// Notification channel name.
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_sample_size() -> usize {
    10
}

fn default_throttle() -> String {
    "100ms".to_string()
}

fn default_stale_after() -> String {
    "1h".to_string()
}

fn default_channel() -> String {
    "analysis".to_string()
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            throttle: default_throttle(),
            stale_after: default_stale_after(),
            channel: default_channel(),
        }
    }
}

impl JobsConfig {
    pub fn throttle(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.throttle)
    }

    pub fn stale_after(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.stale_after)
    }
}

pub fn validate_jobs(config: &JobsConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.sample_size == 0 {
        errors.push("jobs.sample_size: must be at least 1".to_string());
    }
    if let Err(e) = config.throttle() {
        errors.push(format!("jobs.throttle: invalid duration '{}' - {}", config.throttle, e));
    }
    match config.stale_after() {
        Ok(d) if d.is_zero() => errors.push("jobs.stale_after: must be greater than zero".to_string()),
        Ok(_) => {}
        Err(e) => errors.push(format!(
            "jobs.stale_after: invalid duration '{}' - {}",
            config.stale_after, e
        )),
    }
    if config.channel.trim().is_empty() {
        errors.push("jobs.channel: must not be empty".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let config = JobsConfig::default();
        assert_eq!(config.throttle().unwrap(), Duration::from_millis(100));
        assert_eq!(config.stale_after().unwrap(), Duration::from_secs(3600));
        assert!(validate_jobs(&config).is_empty());
    }

    #[test]
    fn test_invalid_values_collected() {
        let config = JobsConfig {
            sample_size: 0,
            throttle: "soon".to_string(),
            stale_after: "0s".to_string(),
            channel: " ".to_string(),
        };
        assert_eq!(validate_jobs(&config).len(), 4);
    }
}
