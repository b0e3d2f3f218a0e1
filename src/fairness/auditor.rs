use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{FairnessConfig, FairnessThresholds};
use super::report::{
    recommendations, AttributeAnalysis, AuditStatus, FairnessReport, IntersectionalAnalysis,
    RiskLevel,
};
use super::stats::{cohen_d, one_way_anova, parity_ratio, GroupStats};

/// One scored subject as seen by the auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSubject {
    pub subject_id: String,
    pub score: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct FairnessAuditor {
    config: FairnessConfig,
}

impl FairnessAuditor {
    pub fn new(config: FairnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FairnessConfig {
        &self.config
    }

    /// Audit a batch of hybrid scores for group disparities.
    ///
    /// With no `attributes` the configured protected attributes are used.
    /// An empty batch yields a `no_data` report.
    pub fn audit(&self, batch: &[ScoredSubject], attributes: &[String]) -> FairnessReport {
        if batch.is_empty() {
            return FairnessReport::no_data();
        }

        let requested: &[String] = if attributes.is_empty() {
            &self.config.protected_attributes
        } else {
            attributes
        };

        let mut analyses = Vec::new();
        let mut skipped = Vec::new();
        for attribute in requested {
            let groups = group_scores(batch, |s| s.attributes.get(attribute).cloned());
            match self.analyze(attribute, &groups) {
                Some(analysis) => analyses.push(analysis),
                None => {
                    debug!(attribute = %attribute, "fewer than two groups, skipping");
                    skipped.push(attribute.clone());
                }
            }
        }

        let intersectional = self.intersectional(batch, requested);

        let mut report = FairnessReport {
            status: AuditStatus::Completed,
            total_analyzed: batch.len(),
            bias_detected: false,
            risk_level: RiskLevel::Low,
            attributes: analyses,
            skipped_attributes: skipped,
            intersectional,
            recommendations: Vec::new(),
            generated_at: Utc::now(),
        };
        let flagged = report.flagged_count();
        report.bias_detected = flagged > 0;
        report.risk_level = RiskLevel::from_flag_count(flagged);
        report.recommendations = recommendations(
            &report.attributes,
            report.intersectional.as_ref(),
            report.risk_level,
        );

        info!(
            total = report.total_analyzed,
            flagged,
            risk = %report.risk_level,
            "fairness audit finished"
        );
        report
    }

    fn intersectional(
        &self,
        batch: &[ScoredSubject],
        requested: &[String],
    ) -> Option<IntersectionalAnalysis> {
        let attrs: &[String] = if self.config.intersectional.len() >= 2 {
            &self.config.intersectional
        } else if requested.len() >= 2 {
            requested
        } else {
            return None;
        };

        let groups = group_scores(batch, |s| {
            attrs
                .iter()
                .map(|a| s.attributes.get(a).cloned())
                .collect::<Option<Vec<String>>>()
                .map(|parts| parts.join("_"))
        });
        let analysis = self.analyze(&attrs.join("_x_"), &groups)?;
        let most_advantaged = analysis.highest_group()?.clone();
        let most_disadvantaged = analysis.lowest_group()?.clone();

        Some(IntersectionalAnalysis {
            attributes: attrs.to_vec(),
            gap: round_to(most_advantaged.mean - most_disadvantaged.mean, 3),
            most_advantaged: most_advantaged.label,
            most_disadvantaged: most_disadvantaged.label,
            analysis,
        })
    }

    /// Run every test for one grouping. `None` when fewer than two groups.
    fn analyze(&self, attribute: &str, groups: &BTreeMap<String, Vec<f64>>) -> Option<AttributeAnalysis> {
        if groups.len() < 2 {
            return None;
        }

        let stats: Vec<GroupStats> = groups
            .iter()
            .map(|(label, scores)| GroupStats::from_scores(label.clone(), scores))
            .collect();
        let means: Vec<f64> = stats.iter().map(|g| g.mean).collect();
        let parity = parity_ratio(&means);

        let samples: Vec<&[f64]> = groups.values().map(Vec::as_slice).collect();
        let anova = one_way_anova(&samples);

        let by_mean = |a: &&GroupStats, b: &&GroupStats| {
            a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal)
        };
        let low = stats.iter().min_by(by_mean)?;
        let high = stats.iter().max_by(by_mean)?;
        let d = cohen_d(&groups[&low.label], &groups[&high.label]);

        let t = &self.config.thresholds;
        let bias_detected = parity > t.parity_ratio || anova.p_value < t.p_value || d.abs() > t.cohen_d;

        Some(AttributeAnalysis {
            attribute: attribute.to_string(),
            interpretation: interpret(attribute, parity, anova.p_value, d, t),
            groups: stats
                .into_iter()
                .map(|g| GroupStats {
                    mean: round_to(g.mean, 3),
                    std: round_to(g.std, 3),
                    ..g
                })
                .collect(),
            parity_ratio: round_to(parity, 3),
            f_stat: round_to(anova.f_stat, 3),
            p_value: round_to(anova.p_value, 4),
            cohen_d: round_to(d, 3),
            bias_detected,
        })
    }
}

fn group_scores<F>(batch: &[ScoredSubject], key: F) -> BTreeMap<String, Vec<f64>>
where
    F: Fn(&ScoredSubject) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for subject in batch {
        if let Some(label) = key(subject).filter(|l| !l.trim().is_empty()) {
            groups.entry(label).or_default().push(subject.score);
        }
    }
    groups
}

fn interpret(attribute: &str, parity: f64, p_value: f64, d: f64, t: &FairnessThresholds) -> String {
    let mut parts = Vec::new();
    if parity > t.parity_ratio {
        parts.push(format!(
            "Mean scores across {} groups differ by {:.1}%, above the {:.1}% tolerance.",
            attribute,
            parity * 100.0,
            t.parity_ratio * 100.0
        ));
    }
    if p_value < t.p_value {
        parts.push(format!("The difference is statistically significant (p={:.4}).", p_value));
    }
    if d.abs() > t.cohen_d {
        let size = if d.abs() < 0.5 {
            "small"
        } else if d.abs() < 0.8 {
            "medium"
        } else {
            "large"
        };
        parts.push(format!("A {} effect size was observed (d={:.2}).", size, d));
    }
    if parts.is_empty() {
        format!("No significant bias found for {}.", attribute)
    } else {
        parts.join(" ")
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
