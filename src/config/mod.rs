mod init;
mod schema;

pub use init::write_default_config;
pub use schema::{Config, StoreConfig};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::fairness::validate_fairness;
use crate::jobs::validate_jobs;
use crate::scoring::validate_scoring;

/// Get the config directory path (~/.config/evalgrade/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("evalgrade"))
}

/// Get the default config file path (~/.config/evalgrade/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Resolve the store directory: the configured one, else `data/` beside the
/// config file.
pub fn resolve_store_dir(config: &Config, config_path: &Path) -> PathBuf {
    match &config.store.dir {
        Some(dir) => dir.clone(),
        None => config_path
            .parent()
            .map(|p| p.join("data"))
            .unwrap_or_else(|| PathBuf::from("data")),
    }
}

/// Load configuration from a YAML file
///
/// With `path` set, the file must exist. Without it, the default path is
/// tried and built-in defaults are used when nothing is there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            path
        }
        None => {
            let default_path = get_config_path()?;
            if !default_path.exists() {
                tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            default_path
        }
    };

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

/// Check every section, reporting all problems together.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    if let Err(scoring) = validate_scoring(&config.scoring) {
        errors.extend(scoring);
    }
    errors.extend(validate_fairness(&config.fairness));
    errors.extend(validate_jobs(&config.jobs));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(dir.path().join("nope.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_empty_sections_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jobs:\n  sample_size: 25\n");
        let config = load_config(Some(path)).unwrap();

        assert_eq!(config.jobs.sample_size, 25);
        assert_eq!(config.jobs.throttle, "100ms");
        assert_eq!(config.scoring.dimensions.len(), 8);
        assert_eq!(config.fairness.thresholds.parity_ratio, 0.1);
        assert!(config.store.dir.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jobs:\n  sample_sise: 25\n");
        let err = load_config(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_validate_collects_all_sections() {
        let mut config = Config::default();
        config.scoring.hybrid.text_weight = 0.9;
        config.fairness.thresholds.p_value = 2.0;
        config.jobs.throttle = "soon".to_string();

        let err = validate_config(&config).unwrap_err();
        let messages = err.messages();
        assert!(messages.iter().any(|m| m.starts_with("scoring.hybrid")));
        assert!(messages.iter().any(|m| m.starts_with("fairness.")));
        assert!(messages.iter().any(|m| m.starts_with("jobs.throttle")));
    }

    #[test]
    fn test_store_dir_resolution() {
        let mut config = Config::default();
        let path = PathBuf::from("/etc/evalgrade/config.yaml");
        assert_eq!(
            resolve_store_dir(&config, &path),
            PathBuf::from("/etc/evalgrade/data")
        );

        config.store.dir = Some(PathBuf::from("/var/lib/evalgrade"));
        assert_eq!(
            resolve_store_dir(&config, &path),
            PathBuf::from("/var/lib/evalgrade")
        );
    }
}
