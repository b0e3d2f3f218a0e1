use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fairness::FairnessConfig;
use crate::jobs::JobsConfig;
use crate::scoring::ScoringConfig;

/// Top-level configuration file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub fairness: FairnessConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory for job and result files. Defaults to `data/` next to the
    /// config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}
