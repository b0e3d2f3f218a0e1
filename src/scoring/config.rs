use serde::{Deserialize, Serialize};

use super::lexicon;

/// One weighted evaluation dimension and its keyword lexicon.
///
/// Example YAML:
/// ```yaml
/// dimensions:
///   - name: performance
///     weight: 0.25
///     description: "Quality and quantity of delivered work"
///     positive: ["excellent", "delivered", "efficient"]
///     negative: ["delayed", "error", "incomplete"]
///     suggestions:
///       - "Agree on measurable weekly delivery targets"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DimensionSpec {
    pub name: String,

    /// Share of the text composite, 0.0-1.0. All weights must sum to 1.0.
    pub weight: f64,

    #[serde(default)]
    pub description: String,

    pub positive: Vec<String>,

    #[serde(default)]
    pub negative: Vec<String>,

    /// Improvement suggestions surfaced when this dimension is the weakest
    /// contributor.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// How text and quantitative composites are blended.
///
/// Example YAML:
/// ```yaml
/// hybrid:
///   text_weight: 0.6
///   quant_weight: 0.4
///   overrides:
///     none: [0.8, 0.2]
///     low: [0.7, 0.3]
///     high: [0.5, 0.5]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HybridConfig {
    #[serde(default = "default_text_weight")]
    pub text_weight: f64,

    #[serde(default = "default_quant_weight")]
    pub quant_weight: f64,

    /// Weight pairs `[text, quant]` keyed by data quality tier.
    #[serde(default = "default_overrides")]
    pub overrides: QualityOverrides,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QualityOverrides {
    #[serde(default)]
    pub none: Option<[f64; 2]>,
    #[serde(default)]
    pub low: Option<[f64; 2]>,
    #[serde(default)]
    pub medium: Option<[f64; 2]>,
    #[serde(default)]
    pub high: Option<[f64; 2]>,
}

fn default_text_weight() -> f64 {
    0.6
}

fn default_quant_weight() -> f64 {
    0.4
}

fn default_overrides() -> QualityOverrides {
    QualityOverrides {
        none: Some([0.8, 0.2]),
        low: Some([0.7, 0.3]),
        medium: None,
        high: Some([0.5, 0.5]),
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            text_weight: default_text_weight(),
            quant_weight: default_quant_weight(),
            overrides: default_overrides(),
        }
    }
}

/// Quantitative normalizer settings.
///
/// Count fields are bucketed by the first matching range.
/// Range format: "<N", "<=N", ">N", ">=N", "N-M" (inclusive), or "N".
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuantitativeConfig {
    #[serde(default = "default_count_buckets")]
    pub count_buckets: Vec<CountBucket>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CountBucket {
    pub range: String,
    pub score: f64,
}

fn default_count_buckets() -> Vec<CountBucket> {
    [("<=0", 30.0), ("<=2", 50.0), ("<=5", 70.0), ("<=10", 85.0), (">10", 95.0)]
        .into_iter()
        .map(|(range, score)| CountBucket {
            range: range.to_string(),
            score,
        })
        .collect()
}

impl Default for QuantitativeConfig {
    fn default() -> Self {
        Self {
            count_buckets: default_count_buckets(),
        }
    }
}

/// The complete scoring configuration section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    #[serde(default = "lexicon::default_dimensions")]
    pub dimensions: Vec<DimensionSpec>,

    #[serde(default)]
    pub hybrid: HybridConfig,

    #[serde(default)]
    pub quantitative: QuantitativeConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dimensions: lexicon::default_dimensions(),
            hybrid: HybridConfig::default(),
            quantitative: QuantitativeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_config() {
        let config = ScoringConfig::default();

        assert_eq!(config.dimensions.len(), 8);
        assert_eq!(config.hybrid.text_weight, 0.6);
        assert_eq!(config.hybrid.quant_weight, 0.4);
        assert_eq!(config.hybrid.overrides.none, Some([0.8, 0.2]));
        assert_eq!(config.hybrid.overrides.low, Some([0.7, 0.3]));
        assert!(config.hybrid.overrides.medium.is_none());
        assert_eq!(config.hybrid.overrides.high, Some([0.5, 0.5]));
        assert_eq!(config.quantitative.count_buckets.len(), 5);
    }

    #[test]
    fn test_scoring_config_serde_roundtrip() {
        let config = ScoringConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ScoringConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_hybrid_config_parse() {
        let yaml = r#"
text_weight: 0.5
quant_weight: 0.5
"#;
        let config: HybridConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.text_weight, 0.5);
        assert_eq!(config.overrides.none, Some([0.8, 0.2]));
    }

    #[test]
    fn test_dimension_spec_parse() {
        let yaml = r#"
name: delivery
weight: 1.0
positive: ["shipped", "on time"]
"#;
        let spec: DimensionSpec = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(spec.name, "delivery");
        assert_eq!(spec.positive.len(), 2);
        assert!(spec.negative.is_empty());
        assert!(spec.suggestions.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
name: delivery
weight: 1.0
positive: ["shipped"]
colour: blue
"#;
        let result: Result<DimensionSpec, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_count_bucket_parse() {
        let yaml = r#"
count_buckets:
  - { range: "0", score: 20 }
  - { range: ">0", score: 80 }
"#;
        let config: QuantitativeConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.count_buckets.len(), 2);
        assert_eq!(config.count_buckets[1].score, 80.0);
    }
}
