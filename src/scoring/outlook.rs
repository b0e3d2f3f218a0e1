//! Rule-based performance outlook derived from the dimension scores.

use serde::{Deserialize, Serialize};

use super::factors::round1;
use super::text::DimensionScore;

/// Dimensions below this score count as development priorities.
const PRIORITY_CEILING: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Steady,
    NeedsAttention,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Steady => "steady",
            Trend::NeedsAttention => "needs_attention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    High,
    Medium,
    Low,
}

impl Readiness {
    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::High => "high",
            Readiness::Medium => "medium",
            Readiness::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceOutlook {
    pub trend: Trend,
    /// 0-1
    pub success_probability: f64,
    /// 0-100, the complement of the mean dimension score.
    pub turnover_risk: f64,
    pub promotion_readiness: Readiness,
    /// Lowest-ranked improvement area scoring under 70, if any.
    pub development_priority: Option<String>,
}

/// Project the outlook from the unweighted mean of the dimension scores.
///
/// | mean     | trend           | success | readiness |
/// |----------|-----------------|---------|-----------|
/// | >= 85    | rising          | 0.85    | high      |
/// | >= 70    | steady          | 0.70    | medium    |
/// | below 70 | needs attention | 0.60    | low       |
///
/// `improvement_areas` is ordered lowest first, as produced by the scorer.
pub fn predict(dimensions: &[DimensionScore], improvement_areas: &[String]) -> PerformanceOutlook {
    let mean = if dimensions.is_empty() {
        0.0
    } else {
        dimensions.iter().map(|d| d.score).sum::<f64>() / dimensions.len() as f64
    };

    let (trend, success_probability, promotion_readiness) = if mean >= 85.0 {
        (Trend::Rising, 0.85, Readiness::High)
    } else if mean >= 70.0 {
        (Trend::Steady, 0.70, Readiness::Medium)
    } else {
        (Trend::NeedsAttention, 0.60, Readiness::Low)
    };

    let development_priority = improvement_areas
        .iter()
        .find(|name| {
            dimensions
                .iter()
                .any(|d| &d.dimension == *name && d.score < PRIORITY_CEILING)
        })
        .cloned();

    PerformanceOutlook {
        trend,
        success_probability,
        turnover_risk: round1((100.0 - mean).clamp(0.0, 100.0)),
        promotion_readiness,
        development_priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(scores: &[(&str, f64)]) -> Vec<DimensionScore> {
        scores
            .iter()
            .map(|(name, score)| DimensionScore {
                dimension: name.to_string(),
                score: *score,
                confidence: 50.0,
                positive_count: 0,
                negative_count: 0,
                positive_terms: vec![],
                negative_terms: vec![],
            })
            .collect()
    }

    #[test]
    fn test_high_mean_is_rising() {
        let d = dims(&[("a", 90.0), ("b", 88.0), ("c", 86.0)]);
        let outlook = predict(&d, &["c".into(), "b".into(), "a".into()]);
        assert_eq!(outlook.trend, Trend::Rising);
        assert_eq!(outlook.success_probability, 0.85);
        assert_eq!(outlook.promotion_readiness, Readiness::High);
        assert_eq!(outlook.turnover_risk, 12.0);
        assert_eq!(outlook.development_priority, None);
    }

    #[test]
    fn test_middle_mean_is_steady() {
        let d = dims(&[("a", 80.0), ("b", 70.0)]);
        let outlook = predict(&d, &["b".into(), "a".into()]);
        assert_eq!(outlook.trend, Trend::Steady);
        assert_eq!(outlook.promotion_readiness, Readiness::Medium);
        assert_eq!(outlook.turnover_risk, 25.0);
        // 70 is not below the priority ceiling.
        assert_eq!(outlook.development_priority, None);
    }

    #[test]
    fn test_low_mean_needs_attention_and_names_priority() {
        let d = dims(&[("a", 70.0), ("b", 40.0), ("c", 55.0)]);
        let outlook = predict(&d, &["b".into(), "c".into(), "a".into()]);
        assert_eq!(outlook.trend, Trend::NeedsAttention);
        assert_eq!(outlook.success_probability, 0.60);
        assert_eq!(outlook.promotion_readiness, Readiness::Low);
        assert_eq!(outlook.turnover_risk, 45.0);
        assert_eq!(outlook.development_priority.as_deref(), Some("b"));
    }
}
