//! Descriptive statistics, one-way ANOVA and Cohen's d.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n-1); 0 for a single observation.
    pub std: f64,
}

impl GroupStats {
    pub fn from_scores(label: impl Into<String>, scores: &[f64]) -> Self {
        Self {
            label: label.into(),
            count: scores.len(),
            mean: mean(scores),
            std: sample_variance(scores).sqrt(),
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

/// `(maxMean - minMean) / avgMean` over group means; 0 when the average
/// mean is not positive.
pub fn parity_ratio(means: &[f64]) -> f64 {
    if means.len() < 2 {
        return 0.0;
    }
    let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = means.iter().copied().fold(f64::INFINITY, f64::min);
    let avg = mean(means);
    if avg > 0.0 {
        (max - min) / avg
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anova {
    pub f_stat: f64,
    pub p_value: f64,
}

impl Anova {
    const NO_EFFECT: Anova = Anova {
        f_stat: 0.0,
        p_value: 1.0,
    };
}

/// One-way ANOVA across groups.
///
/// Fewer than two groups, or no within-group degrees of freedom, gives F=0,
/// p=1. Zero within-group variance gives F=inf, p=0 when the group means
/// differ and F=0, p=1 when they do not.
pub fn one_way_anova(groups: &[&[f64]]) -> Anova {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k {
        return Anova::NO_EFFECT;
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in &groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand_mean).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    if ss_within <= f64::EPSILON {
        return if ss_between > f64::EPSILON {
            Anova {
                f_stat: f64::INFINITY,
                p_value: 0.0,
            }
        } else {
            Anova::NO_EFFECT
        };
    }

    let f_stat = (ss_between / df_between) / (ss_within / df_within);
    let p_value = match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => dist.sf(f_stat).clamp(0.0, 1.0),
        Err(_) => 1.0,
    };
    Anova { f_stat, p_value }
}

/// Cohen's d between two samples using the pooled standard deviation,
/// `(mean(a) - mean(b)) / pooled`. Zero when it cannot be computed.
pub fn cohen_d(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if n1 + n2 <= 2.0 {
        return 0.0;
    }
    let pooled = (((n1 - 1.0).max(0.0) * sample_variance(a)
        + (n2 - 1.0).max(0.0) * sample_variance(b))
        / (n1 + n2 - 2.0))
        .sqrt();
    if pooled > 0.0 {
        (mean(a) - mean(b)) / pooled
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_group_stats() {
        let stats = GroupStats::from_scores("a", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        assert!(approx(stats.std, 2.138, 1e-3));
    }

    #[test]
    fn test_singleton_group_std_is_zero() {
        let stats = GroupStats::from_scores("solo", &[71.0]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.mean, 71.0);
    }

    #[test]
    fn test_parity_ratio() {
        assert!(approx(parity_ratio(&[80.0, 60.0]), 0.2857, 1e-4));
        assert_eq!(parity_ratio(&[70.0, 70.0]), 0.0);
        assert_eq!(parity_ratio(&[0.0, 0.0]), 0.0);
        assert_eq!(parity_ratio(&[50.0]), 0.0);
    }

    #[test]
    fn test_anova_known_values() {
        // scipy.stats.f_oneway([1,2,3],[4,5,6]) -> F=13.5, p=0.02131
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let result = one_way_anova(&[&a, &b]);
        assert!(approx(result.f_stat, 13.5, 1e-9));
        assert!(approx(result.p_value, 0.02131, 1e-4));
    }

    #[test]
    fn test_anova_identical_groups() {
        let a = [70.0, 70.0];
        let b = [70.0, 70.0];
        assert_eq!(one_way_anova(&[&a, &b]), Anova { f_stat: 0.0, p_value: 1.0 });
    }

    #[test]
    fn test_anova_zero_within_variance() {
        let a = [80.0, 80.0];
        let b = [60.0, 60.0];
        let result = one_way_anova(&[&a, &b]);
        assert!(result.f_stat.is_infinite());
        assert_eq!(result.p_value, 0.0);
    }

    #[test]
    fn test_anova_degenerate_inputs() {
        let a = [1.0, 2.0];
        assert_eq!(one_way_anova(&[&a]), Anova { f_stat: 0.0, p_value: 1.0 });
        // one observation per group leaves no within-group freedom
        assert_eq!(one_way_anova(&[&[1.0], &[9.0]]), Anova { f_stat: 0.0, p_value: 1.0 });
    }

    #[test]
    fn test_cohen_d_sign_and_size() {
        let low = [58.0, 60.0, 62.0];
        let high = [78.0, 80.0, 82.0];
        let d = cohen_d(&low, &high);
        assert!(d < 0.0);
        assert!(approx(d, -10.0, 1e-9));
    }

    #[test]
    fn test_cohen_d_zero_pooled() {
        assert_eq!(cohen_d(&[5.0, 5.0], &[5.0, 5.0]), 0.0);
        assert_eq!(cohen_d(&[5.0], &[6.0]), 0.0);
    }
}
