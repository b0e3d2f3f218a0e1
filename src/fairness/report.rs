use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::stats::GroupStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// LOW for no flagged analyses, MEDIUM for exactly one, HIGH otherwise.
    pub fn from_flag_count(flagged: usize) -> Self {
        match flagged {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Completed,
    NoData,
}

/// Test outcome for one protected attribute (or one synthesized composite
/// attribute in the intersectional pass).
///
/// `f_stat` may be infinite; JSON renders it as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeAnalysis {
    pub attribute: String,
    pub groups: Vec<GroupStats>,
    pub parity_ratio: f64,
    pub f_stat: f64,
    pub p_value: f64,
    pub cohen_d: f64,
    pub bias_detected: bool,
    pub interpretation: String,
}

impl AttributeAnalysis {
    pub fn lowest_group(&self) -> Option<&GroupStats> {
        self.groups
            .iter()
            .min_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn highest_group(&self) -> Option<&GroupStats> {
        self.groups
            .iter()
            .max_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionalAnalysis {
    pub attributes: Vec<String>,
    pub analysis: AttributeAnalysis,
    pub most_advantaged: String,
    pub most_disadvantaged: String,
    /// Mean score gap between the most and least advantaged composite groups.
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairnessReport {
    pub status: AuditStatus,
    pub total_analyzed: usize,
    pub bias_detected: bool,
    pub risk_level: RiskLevel,
    pub attributes: Vec<AttributeAnalysis>,
    pub skipped_attributes: Vec<String>,
    pub intersectional: Option<IntersectionalAnalysis>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl FairnessReport {
    pub fn no_data() -> Self {
        Self {
            status: AuditStatus::NoData,
            total_analyzed: 0,
            bias_detected: false,
            risk_level: RiskLevel::Low,
            attributes: Vec::new(),
            skipped_attributes: Vec::new(),
            intersectional: None,
            recommendations: vec![
                "No scored results were available; rerun the audit once the job has produced results."
                    .to_string(),
            ],
            generated_at: Utc::now(),
        }
    }

    /// Number of flagged analyses, the intersectional pass counted once.
    pub fn flagged_count(&self) -> usize {
        let attributes = self.attributes.iter().filter(|a| a.bias_detected).count();
        let intersectional = self
            .intersectional
            .as_ref()
            .map_or(0, |i| usize::from(i.analysis.bias_detected));
        attributes + intersectional
    }
}

const GOVERNANCE: &[&str] = &[
    "Run a bias audit at least once per quarter.",
    "Strengthen evaluator training on consistent, inclusive assessment.",
    "Keep a human review step for every automated evaluation outcome.",
];

/// Deterministic recommendations: one per flagged attribute, one for the
/// risk level, then standing governance items. Never empty.
pub fn recommendations(
    attributes: &[AttributeAnalysis],
    intersectional: Option<&IntersectionalAnalysis>,
    risk: RiskLevel,
) -> Vec<String> {
    let flagged: Vec<&AttributeAnalysis> = attributes.iter().filter(|a| a.bias_detected).collect();
    let intersectional = intersectional.filter(|i| i.analysis.bias_detected);

    if flagged.is_empty() && intersectional.is_none() {
        return vec![
            "No significant bias detected in this batch. Continue monitoring each evaluation cycle."
                .to_string(),
        ];
    }

    let mut out: Vec<String> = flagged.iter().map(|a| attribute_template(a)).collect();

    if let Some(i) = intersectional {
        out.push(format!(
            "Intersectional gap of {:.1} points between {} and {} ({}): review how criteria combine for these groups.",
            i.gap,
            i.most_advantaged,
            i.most_disadvantaged,
            i.attributes.join(" x ")
        ));
    }

    match risk {
        RiskLevel::High => out.push(
            "High risk: pause automated grading for affected groups and review the evaluation process end to end with outside expertise."
                .to_string(),
        ),
        RiskLevel::Medium => out.push(
            "Medium risk: prioritise mitigation for the flagged attribute and move bias monitoring to monthly."
                .to_string(),
        ),
        RiskLevel::Low => {}
    }

    out.extend(GOVERNANCE.iter().map(|s| s.to_string()));
    out
}

fn attribute_template(analysis: &AttributeAnalysis) -> String {
    let name = analysis.attribute.to_lowercase();
    if name.contains("gender") || name.contains("sex") {
        "Gender bias: use gender-neutral language in evaluation criteria and include evaluators with diverse perspectives."
            .to_string()
    } else if name.contains("age") {
        "Age bias: acknowledge generational differences in working style and adopt age-neutral performance indicators."
            .to_string()
    } else if name.contains("department") || name.contains("dept") || name.contains("team") {
        "Department bias: calibrate criteria to each department's work and introduce cross-functional reviews."
            .to_string()
    } else {
        let lowest = analysis
            .lowest_group()
            .map(|g| g.label.as_str())
            .unwrap_or("the lowest group");
        format!(
            "'{}' bias: review evaluation criteria for '{}' groups, starting with '{}'.",
            analysis.attribute, analysis.attribute, lowest
        )
    }
}
