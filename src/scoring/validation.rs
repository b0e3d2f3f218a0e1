use std::collections::HashSet;

use super::config::{DimensionSpec, HybridConfig, QuantitativeConfig, ScoringConfig};
use super::factors::RangeOp;

/// Tolerance for the dimension weight-sum check.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    errors.extend(dimension_errors(&config.dimensions));
    errors.extend(hybrid_errors(&config.hybrid));
    errors.extend(quantitative_errors(&config.quantitative));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Problems with a dimension set: empty set, bad names, weights outside
/// [0,1], a weight sum other than 1.0, or dimensions with no positive terms.
pub fn dimension_errors(dimensions: &[DimensionSpec]) -> Vec<String> {
    let mut errors = Vec::new();

    if dimensions.is_empty() {
        errors.push("scoring.dimensions: at least one dimension is required".to_string());
        return errors;
    }

    let mut seen = HashSet::new();
    for (i, dim) in dimensions.iter().enumerate() {
        if dim.name.trim().is_empty() {
            errors.push(format!("scoring.dimensions[{}].name: must not be empty", i));
        } else if !seen.insert(dim.name.to_lowercase()) {
            errors.push(format!(
                "scoring.dimensions[{}].name: duplicate dimension '{}'",
                i, dim.name
            ));
        }

        if !(0.0..=1.0).contains(&dim.weight) || !dim.weight.is_finite() {
            errors.push(format!(
                "scoring.dimensions[{}].weight: {} is outside 0.0-1.0",
                i, dim.weight
            ));
        }

        if dim.positive.iter().all(|t| t.trim().is_empty()) {
            errors.push(format!(
                "scoring.dimensions[{}].positive: '{}' needs at least one term",
                i, dim.name
            ));
        }
    }

    let total: f64 = dimensions.iter().map(|d| d.weight).sum();
    if (total - 1.0).abs() > WEIGHT_EPSILON {
        errors.push(format!(
            "scoring.dimensions: weights sum to {:.4}, expected 1.0",
            total
        ));
    }

    errors
}

fn hybrid_errors(hybrid: &HybridConfig) -> Vec<String> {
    let mut errors = Vec::new();

    check_pair(
        "scoring.hybrid",
        [hybrid.text_weight, hybrid.quant_weight],
        &mut errors,
    );

    let overrides = [
        ("none", hybrid.overrides.none),
        ("low", hybrid.overrides.low),
        ("medium", hybrid.overrides.medium),
        ("high", hybrid.overrides.high),
    ];
    for (tier, pair) in overrides {
        if let Some(pair) = pair {
            check_pair(&format!("scoring.hybrid.overrides.{}", tier), pair, &mut errors);
        }
    }

    errors
}

fn check_pair(path: &str, [text, quant]: [f64; 2], errors: &mut Vec<String>) {
    if !(0.0..=1.0).contains(&text) || !(0.0..=1.0).contains(&quant) {
        errors.push(format!("{}: weights must be within 0.0-1.0", path));
    } else if (text + quant - 1.0).abs() > WEIGHT_EPSILON {
        errors.push(format!(
            "{}: text and quant weights sum to {:.4}, expected 1.0",
            path,
            text + quant
        ));
    }
}

fn quantitative_errors(quant: &QuantitativeConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if quant.count_buckets.is_empty() {
        errors.push("scoring.quantitative.count_buckets: at least one bucket is required".to_string());
    }

    for (i, bucket) in quant.count_buckets.iter().enumerate() {
        if let Err(e) = RangeOp::parse(&bucket.range) {
            errors.push(format!(
                "scoring.quantitative.count_buckets[{}].range: invalid '{}' - {}",
                i, bucket.range, e
            ));
        }
        if !(0.0..=100.0).contains(&bucket.score) {
            errors.push(format!(
                "scoring.quantitative.count_buckets[{}].score: {} is outside 0-100",
                i, bucket.score
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::config::CountBucket;

    fn dim(name: &str, weight: f64) -> DimensionSpec {
        DimensionSpec {
            name: name.to_string(),
            weight,
            description: String::new(),
            positive: vec!["good".to_string()],
            negative: vec![],
            suggestions: vec![],
        }
    }

    fn config_with(dimensions: Vec<DimensionSpec>) -> ScoringConfig {
        ScoringConfig {
            dimensions,
            ..ScoringConfig::default()
        }
    }

    #[test]
    fn test_valid_default_config() {
        assert!(validate_scoring(&ScoringConfig::default()).is_ok());
    }

    #[test]
    fn test_weights_not_summing_to_one() {
        let config = config_with(vec![dim("a", 0.5), dim("b", 0.4)]);
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("weights sum to 0.9000"));
    }

    #[test]
    fn test_weight_sum_within_epsilon() {
        let config = config_with(vec![dim("a", 0.1), dim("b", 0.2), dim("c", 0.7)]);
        assert!(validate_scoring(&config).is_ok());
    }

    #[test]
    fn test_empty_dimension_set() {
        let errors = validate_scoring(&config_with(vec![])).unwrap_err();
        assert!(errors[0].contains("at least one dimension"));
    }

    #[test]
    fn test_duplicate_names_case_insensitive() {
        let config = config_with(vec![dim("Delivery", 0.5), dim("delivery", 0.5)]);
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.dimensions[1].name: duplicate"));
    }

    #[test]
    fn test_weight_out_of_range() {
        let config = config_with(vec![dim("a", 1.5), dim("b", -0.5)]);
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("dimensions[0].weight")));
        assert!(errors.iter().any(|e| e.contains("dimensions[1].weight")));
    }

    #[test]
    fn test_missing_positive_terms() {
        let mut d = dim("a", 1.0);
        d.positive = vec![" ".to_string()];
        let errors = validate_scoring(&config_with(vec![d])).unwrap_err();
        assert!(errors[0].contains("positive"));
    }

    #[test]
    fn test_invalid_hybrid_weights() {
        let mut config = ScoringConfig::default();
        config.hybrid.text_weight = 0.7;
        config.hybrid.overrides.high = Some([0.9, 0.3]);
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("scoring.hybrid:"));
        assert!(errors[1].starts_with("scoring.hybrid.overrides.high"));
    }

    #[test]
    fn test_invalid_count_bucket() {
        let mut config = ScoringConfig::default();
        config.quantitative.count_buckets = vec![CountBucket {
            range: "lots".to_string(),
            score: 120.0,
        }];
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("count_buckets[0].range"));
        assert!(errors[1].contains("count_buckets[0].score"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = config_with(vec![dim("", 0.2)]);
        config.hybrid.quant_weight = 0.9;
        let errors = validate_scoring(&config).unwrap_err();
        // empty name, weight sum, hybrid pair
        assert_eq!(errors.len(), 3);
    }
}
