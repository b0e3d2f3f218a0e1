//! Hybrid combiner and explainer.
//!
//! Blends the text and quantitative channels into one graded result and
//! explains which dimensions and signals moved it away from neutral.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{HybridConfig, QualityOverrides};
use super::factors::round1;
use super::grade::Grade;
use super::quant::{DataQuality, QuantResult, QuantitativeSignal, SignalCategory};
use super::text::{DimensionScore, DimensionSet, NarrativeInsights, TextResult, NEUTRAL_SCORE};

/// Maximum number of entries in [`ExtendedAttributes`].
pub const MAX_EXTENDED_ATTRIBUTES: usize = 16;

const TOP_CONTRIBUTORS: usize = 3;
const MAX_SUGGESTIONS: usize = 3;

/// Which channels feed the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Hybrid,
    Text,
    Quantitative,
}

impl AnalysisMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Hybrid => "hybrid",
            AnalysisMode::Text => "text",
            AnalysisMode::Quantitative => "quantitative",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hybrid" => Ok(AnalysisMode::Hybrid),
            "text" => Ok(AnalysisMode::Text),
            "quantitative" | "quant" => Ok(AnalysisMode::Quantitative),
            other => Err(format!(
                "unknown analysis mode '{}', expected hybrid, text or quantitative",
                other
            )),
        }
    }
}

/// Text/quant weight selection driven by data quality.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridPolicy {
    base: [f64; 2],
    overrides: QualityOverrides,
}

impl HybridPolicy {
    pub fn new(config: &HybridConfig) -> Self {
        Self {
            base: [config.text_weight, config.quant_weight],
            overrides: config.overrides.clone(),
        }
    }

    /// Weights `(text, quant)` for one record.
    pub fn weights(&self, mode: AnalysisMode, text_available: bool, quality: DataQuality) -> (f64, f64) {
        match mode {
            AnalysisMode::Text => (1.0, 0.0),
            AnalysisMode::Quantitative => (0.0, 1.0),
            AnalysisMode::Hybrid if !text_available => (0.0, 1.0),
            AnalysisMode::Hybrid => {
                let tier = match quality {
                    DataQuality::None => self.overrides.none,
                    DataQuality::Low => self.overrides.low,
                    DataQuality::Medium => self.overrides.medium,
                    DataQuality::High => self.overrides.high,
                };
                let [text, quant] = tier.unwrap_or(self.base);
                (text, quant)
            }
        }
    }
}

impl Default for HybridPolicy {
    fn default() -> Self {
        Self::new(&HybridConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelScore {
    pub score: f64,
    pub grade: Grade,
    pub confidence: f64,
}

impl ChannelScore {
    fn new(score: f64, confidence: f64) -> Self {
        Self {
            score,
            grade: Grade::from_score(score),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantSummary {
    pub score: f64,
    pub grade: Grade,
    pub confidence: f64,
    pub data_quality: DataQuality,
    pub signal_count: usize,
}

/// Channel weights as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub text_pct: f64,
    pub quant_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributorKind {
    Dimension,
    Signal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub kind: ContributorKind,
    pub name: String,
    pub score: f64,
    /// Points this contributor moved the hybrid score away from 50.
    pub contribution: f64,
    /// Matched terms for dimensions, the raw value for signals.
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceTier::High
        } else if confidence >= 60.0 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn narrative(self) -> &'static str {
        match self {
            ConfidenceTier::High => {
                "High confidence: the result rests on ample narrative and quantitative evidence."
            }
            ConfidenceTier::Medium => {
                "Medium confidence: the result is usable but part of the evidence is thin."
            }
            ConfidenceTier::Low => {
                "Low confidence: gather more narrative detail or metrics before acting on this result."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub positive: Vec<Contributor>,
    pub negative: Vec<Contributor>,
    pub suggestions: Vec<String>,
    pub confidence_tier: ConfidenceTier,
    pub confidence_note: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
}

/// Free-form labelled attributes, capped at [`MAX_EXTENDED_ATTRIBUTES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtendedAttributes(BTreeMap<String, String>);

impl ExtendedAttributes {
    /// Insert or replace an entry. A new key is refused once the map is full.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if !self.0.contains_key(&key) && self.0.len() >= MAX_EXTENDED_ATTRIBUTES {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// The graded, explained outcome for one record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub mode: AnalysisMode,
    pub text_available: bool,
    pub text: ChannelScore,
    pub quant: QuantSummary,
    pub hybrid: ChannelScore,
    pub composition: Composition,
    pub dimensions: Vec<DimensionScore>,
    pub signals: Vec<QuantitativeSignal>,
    pub explanation: Explanation,
    /// Distribution, outlook and bias screen of the narrative, when present.
    #[serde(default)]
    pub narrative: Option<NarrativeInsights>,
    #[serde(default)]
    pub extended: ExtendedAttributes,
}

impl CompositeResult {
    /// Flatten into one labelled row for tabular or JSON export.
    pub fn flat_metrics(&self) -> BTreeMap<String, Value> {
        let mut row = BTreeMap::new();
        row.insert("mode".to_string(), Value::from(self.mode.as_str()));
        row.insert("text_available".to_string(), Value::from(self.text_available));
        row.insert("text_score".to_string(), Value::from(self.text.score));
        row.insert("text_grade".to_string(), Value::from(self.text.grade.label()));
        row.insert("text_confidence".to_string(), Value::from(self.text.confidence));
        row.insert("quant_score".to_string(), Value::from(self.quant.score));
        row.insert("quant_grade".to_string(), Value::from(self.quant.grade.label()));
        row.insert("quant_confidence".to_string(), Value::from(self.quant.confidence));
        row.insert("data_quality".to_string(), Value::from(self.quant.data_quality.as_str()));
        row.insert("signal_count".to_string(), Value::from(self.quant.signal_count));
        row.insert("hybrid_score".to_string(), Value::from(self.hybrid.score));
        row.insert("hybrid_grade".to_string(), Value::from(self.hybrid.grade.label()));
        row.insert("hybrid_confidence".to_string(), Value::from(self.hybrid.confidence));
        row.insert("text_pct".to_string(), Value::from(self.composition.text_pct));
        row.insert("quant_pct".to_string(), Value::from(self.composition.quant_pct));
        for d in &self.dimensions {
            row.insert(format!("dim.{}", d.dimension), Value::from(d.score));
        }
        for s in &self.signals {
            row.insert(format!("signal.{}_{}", s.category, s.field), Value::from(s.score));
        }
        row.insert(
            "strengths".to_string(),
            Value::from(self.explanation.strengths.join(",")),
        );
        row.insert(
            "improvement_areas".to_string(),
            Value::from(self.explanation.improvement_areas.join(",")),
        );
        if let Some(n) = &self.narrative {
            row.insert("text_consistency".to_string(), Value::from(n.consistency.as_str()));
            row.insert("text_std".to_string(), Value::from(n.distribution.std));
            row.insert("outlook_trend".to_string(), Value::from(n.outlook.trend.as_str()));
            row.insert("turnover_risk".to_string(), Value::from(n.outlook.turnover_risk));
            row.insert(
                "promotion_readiness".to_string(),
                Value::from(n.outlook.promotion_readiness.as_str()),
            );
            row.insert("narrative_fairness_score".to_string(), Value::from(n.bias.fairness_score));
            row.insert("narrative_is_fair".to_string(), Value::from(n.bias.is_fair));
        }
        for (k, v) in self.extended.iter() {
            row.insert(format!("ext.{}", k), Value::from(v.as_str()));
        }
        row
    }
}

/// Blends channel results. Holds only read-only configuration, so `combine`
/// is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct HybridCombiner {
    dimensions: Arc<DimensionSet>,
    policy: HybridPolicy,
}

impl HybridCombiner {
    pub fn new(dimensions: Arc<DimensionSet>, policy: HybridPolicy) -> Self {
        Self { dimensions, policy }
    }

    pub fn policy(&self) -> &HybridPolicy {
        &self.policy
    }

    pub fn combine(
        &self,
        text: &TextResult,
        quant: &QuantResult,
        signals: &BTreeMap<String, QuantitativeSignal>,
        mode: AnalysisMode,
    ) -> CompositeResult {
        let (w_text, w_quant) = self.policy.weights(mode, text.available, quant.data_quality);

        let hybrid_score = round1((text.score * w_text + quant.score * w_quant).clamp(0.0, 100.0));
        let hybrid_confidence =
            round1((text.confidence * w_text + quant.confidence * w_quant).clamp(0.0, 100.0));

        let contributors = self.contributors(text, signals, w_text, w_quant);
        let tier = ConfidenceTier::from_confidence(hybrid_confidence);
        let explanation = Explanation {
            positive: top_positive(&contributors),
            negative: top_negative(&contributors),
            suggestions: self.suggestions(&contributors, signals),
            confidence_tier: tier,
            confidence_note: tier.narrative().to_string(),
            strengths: text.strengths.clone(),
            improvement_areas: text.improvement_areas.clone(),
        };

        let mut extended = ExtendedAttributes::default();
        extended.insert("analysis_mode", mode.as_str());
        extended.insert("data_quality", quant.data_quality.as_str());
        extended.insert("hybrid_grade_description", Grade::from_score(hybrid_score).description());
        extended.insert("hybrid_percentile", Grade::from_score(hybrid_score).percentile());

        CompositeResult {
            mode,
            text_available: text.available,
            text: ChannelScore::new(text.score, text.confidence),
            quant: QuantSummary {
                score: quant.score,
                grade: Grade::from_score(quant.score),
                confidence: quant.confidence,
                data_quality: quant.data_quality,
                signal_count: quant.signal_count,
            },
            hybrid: ChannelScore::new(hybrid_score, hybrid_confidence),
            composition: Composition {
                text_pct: round1(w_text * 100.0),
                quant_pct: round1(w_quant * 100.0),
            },
            dimensions: text.dimensions.clone(),
            signals: signals.values().cloned().collect(),
            explanation,
            narrative: text.insights.clone(),
            extended,
        }
    }

    fn contributors(
        &self,
        text: &TextResult,
        signals: &BTreeMap<String, QuantitativeSignal>,
        w_text: f64,
        w_quant: f64,
    ) -> Vec<Contributor> {
        let mut out = Vec::new();

        if text.available && w_text > 0.0 {
            let total: f64 = self.dimensions.specs().iter().map(|s| s.weight).sum();
            for d in &text.dimensions {
                let weight = self
                    .dimensions
                    .get(&d.dimension)
                    .map(|s| s.weight)
                    .unwrap_or(0.0);
                if total <= 0.0 || weight <= 0.0 {
                    continue;
                }
                let contribution = (d.score - NEUTRAL_SCORE) * (weight / total) * w_text;
                let evidence = if contribution >= 0.0 {
                    d.positive_terms.clone()
                } else {
                    d.negative_terms.clone()
                };
                out.push(Contributor {
                    kind: ContributorKind::Dimension,
                    name: d.dimension.clone(),
                    score: d.score,
                    contribution: round2(contribution),
                    evidence,
                });
            }
        }

        if w_quant > 0.0 {
            let total: f64 = signals.values().map(|s| s.category.weight()).sum();
            for (key, s) in signals {
                if total <= 0.0 {
                    break;
                }
                let contribution = (s.score - NEUTRAL_SCORE) * (s.category.weight() / total) * w_quant;
                out.push(Contributor {
                    kind: ContributorKind::Signal,
                    name: key.clone(),
                    score: s.score,
                    contribution: round2(contribution),
                    evidence: vec![s.raw.clone()],
                });
            }
        }

        out
    }

    /// Up to three suggestions keyed off the weakest contributor.
    fn suggestions(
        &self,
        contributors: &[Contributor],
        signals: &BTreeMap<String, QuantitativeSignal>,
    ) -> Vec<String> {
        let weakest = contributors
            .iter()
            .min_by(|a, b| a.contribution.partial_cmp(&b.contribution).unwrap_or(Ordering::Equal));

        let Some(weakest) = weakest else {
            return vec![
                "Provide a written narrative and quantitative metrics so the evaluation has evidence to work from."
                    .to_string(),
            ];
        };

        let mut suggestions: Vec<String> = match weakest.kind {
            ContributorKind::Dimension => self
                .dimensions
                .get(&weakest.name)
                .map(|spec| spec.suggestions.clone())
                .unwrap_or_default(),
            ContributorKind::Signal => signals
                .get(&weakest.name)
                .map(signal_suggestions)
                .unwrap_or_default(),
        };
        if suggestions.is_empty() {
            suggestions.push(format!(
                "Agree on a concrete development goal for '{}' and review it next cycle.",
                weakest.name
            ));
        }
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}

fn signal_suggestions(signal: &QuantitativeSignal) -> Vec<String> {
    let field = &signal.field;
    let specific = match signal.category {
        SignalCategory::Grade => format!("Review the criteria behind the '{}' grade with the evaluator.", field),
        SignalCategory::Score => format!("Set a measurable target for raising '{}'.", field),
        SignalCategory::Rate => format!("Track '{}' monthly against an agreed baseline.", field),
        SignalCategory::Count => format!("Plan for more of the activity counted by '{}'.", field),
    };
    vec![
        specific,
        format!("Pair '{}' with a mentor check-in to find the blocker.", field),
        "Revisit this metric at the next review to confirm the trend.".to_string(),
    ]
}

fn top_positive(contributors: &[Contributor]) -> Vec<Contributor> {
    let mut positive: Vec<Contributor> = contributors
        .iter()
        .filter(|c| c.contribution > 0.0)
        .cloned()
        .collect();
    positive.sort_by(|a, b| b.contribution.partial_cmp(&a.contribution).unwrap_or(Ordering::Equal));
    positive.truncate(TOP_CONTRIBUTORS);
    positive
}

fn top_negative(contributors: &[Contributor]) -> Vec<Contributor> {
    let mut negative: Vec<Contributor> = contributors
        .iter()
        .filter(|c| c.contribution < 0.0)
        .cloned()
        .collect();
    negative.sort_by(|a, b| a.contribution.partial_cmp(&b.contribution).unwrap_or(Ordering::Equal));
    negative.truncate(TOP_CONTRIBUTORS);
    negative
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::FieldValue;
    use crate::scoring::config::QuantitativeConfig;
    use crate::scoring::lexicon::default_dimensions;
    use crate::scoring::quant::{compose, QuantitativeNormalizer};
    use crate::scoring::text::analyze;

    fn combiner() -> HybridCombiner {
        let set = DimensionSet::new(default_dimensions()).unwrap();
        HybridCombiner::new(Arc::new(set), HybridPolicy::default())
    }

    fn inputs(
        narrative: Option<&str>,
        fields: &[(&str, FieldValue)],
    ) -> (TextResult, QuantResult, BTreeMap<String, QuantitativeSignal>) {
        let set = DimensionSet::new(default_dimensions()).unwrap();
        let text = analyze(narrative, &set).unwrap();
        let row = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let signals = QuantitativeNormalizer::new(&QuantitativeConfig::default()).extract(&row);
        let quant = compose(&signals);
        (text, quant, signals)
    }

    const NARRATIVE: &str = "Consistently excellent work, exceeded target on every KPI, \
        proactive and collaborative, but reports were sometimes delayed.";

    #[test]
    fn test_policy_base_and_overrides() {
        let policy = HybridPolicy::default();
        assert_eq!(policy.weights(AnalysisMode::Hybrid, true, DataQuality::None), (0.8, 0.2));
        assert_eq!(policy.weights(AnalysisMode::Hybrid, true, DataQuality::Low), (0.7, 0.3));
        assert_eq!(policy.weights(AnalysisMode::Hybrid, true, DataQuality::Medium), (0.6, 0.4));
        assert_eq!(policy.weights(AnalysisMode::Hybrid, true, DataQuality::High), (0.5, 0.5));
    }

    #[test]
    fn test_policy_high_quality_override_can_be_cleared() {
        let mut config = HybridConfig::default();
        config.overrides.high = None;
        let policy = HybridPolicy::new(&config);
        assert_eq!(policy.weights(AnalysisMode::Hybrid, true, DataQuality::High), (0.6, 0.4));
    }

    #[test]
    fn test_policy_modes() {
        let policy = HybridPolicy::default();
        assert_eq!(policy.weights(AnalysisMode::Text, true, DataQuality::High), (1.0, 0.0));
        assert_eq!(policy.weights(AnalysisMode::Quantitative, true, DataQuality::None), (0.0, 1.0));
        assert_eq!(policy.weights(AnalysisMode::Hybrid, false, DataQuality::Low), (0.0, 1.0));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Hybrid".parse::<AnalysisMode>(), Ok(AnalysisMode::Hybrid));
        assert_eq!("quant".parse::<AnalysisMode>(), Ok(AnalysisMode::Quantitative));
        assert!("both".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_combine_blends_scores() {
        let (text, quant, signals) = inputs(
            Some(NARRATIVE),
            &[("performance_grade", FieldValue::Text("A".into()))],
        );
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);

        // one signal: low quality, weights 0.7/0.3
        assert_eq!(result.composition.text_pct, 70.0);
        assert_eq!(result.composition.quant_pct, 30.0);
        let expected = round1(text.score * 0.7 + 95.0 * 0.3);
        assert_eq!(result.hybrid.score, expected);
        assert_eq!(result.hybrid.grade, Grade::from_score(expected));
        assert_eq!(result.quant.grade, Grade::Exceptional);
    }

    #[test]
    fn test_combine_is_deterministic() {
        let (text, quant, signals) = inputs(
            Some(NARRATIVE),
            &[
                ("kpi_score", FieldValue::Number(0.72)),
                ("attendance_rate", FieldValue::Text("98%".into())),
            ],
        );
        let c = combiner();
        let a = c.combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        let b = c.combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_narrative_uses_quantitative_only() {
        let (text, quant, signals) = inputs(None, &[("kpi_score", FieldValue::Number(90.0))]);
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        assert!(!result.text_available);
        assert_eq!(result.composition.text_pct, 0.0);
        assert_eq!(result.hybrid.score, 90.0);
        assert!(result
            .explanation
            .positive
            .iter()
            .all(|c| c.kind == ContributorKind::Signal));
    }

    #[test]
    fn test_explanation_ranks_contributors() {
        let (text, quant, signals) = inputs(
            Some(NARRATIVE),
            &[
                ("performance_grade", FieldValue::Text("D".into())),
                ("award_count", FieldValue::Number(12.0)),
            ],
        );
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        let explanation = &result.explanation;

        assert!(explanation.positive.len() <= 3);
        assert!(explanation.negative.len() <= 3);
        assert!(explanation.positive.windows(2).all(|w| w[0].contribution >= w[1].contribution));
        assert!(explanation.negative.windows(2).all(|w| w[0].contribution <= w[1].contribution));
        // grade D scores a neutral 50 and moves nothing
        assert!(explanation
            .positive
            .iter()
            .chain(explanation.negative.iter())
            .all(|c| c.name != "grade_performance_grade"));
        let performance = explanation
            .positive
            .iter()
            .find(|c| c.name == "performance");
        if let Some(p) = performance {
            assert!(p.evidence.contains(&"excellent".to_string()));
        }
    }

    #[test]
    fn test_suggestions_from_weakest_signal() {
        let (text, quant, signals) = inputs(
            None,
            &[
                ("kpi_score", FieldValue::Number(95.0)),
                ("attendance_rate", FieldValue::Text("20%".into())),
            ],
        );
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        let suggestions = &result.explanation.suggestions;
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions[0].contains("attendance_rate"));
    }

    #[test]
    fn test_suggestions_from_weakest_dimension() {
        let narrative = "The project was delayed again, with repeated error reports and incomplete hand-offs.";
        let (text, quant, signals) = inputs(Some(narrative), &[]);
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Text);
        let weakest = &result.explanation.negative[0];
        assert_eq!(weakest.kind, ContributorKind::Dimension);
        let set = DimensionSet::new(default_dimensions()).unwrap();
        let expected = &set.get(&weakest.name).unwrap().suggestions;
        assert_eq!(&result.explanation.suggestions, expected);
    }

    #[test]
    fn test_no_evidence_still_suggests() {
        let (text, quant, signals) = inputs(None, &[]);
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        assert_eq!(result.hybrid.score, 50.0);
        assert_eq!(result.explanation.suggestions.len(), 1);
        assert_eq!(result.explanation.confidence_tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceTier::from_confidence(80.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(79.9), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(60.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(59.9), ConfidenceTier::Low);
    }

    #[test]
    fn test_extended_attributes_bounded() {
        let mut ext = ExtendedAttributes::default();
        for i in 0..MAX_EXTENDED_ATTRIBUTES {
            assert!(ext.insert(format!("k{}", i), "v"));
        }
        assert!(!ext.insert("overflow", "v"));
        assert!(ext.insert("k0", "replaced"));
        assert_eq!(ext.len(), MAX_EXTENDED_ATTRIBUTES);
        assert_eq!(ext.get("k0"), Some("replaced"));
    }

    #[test]
    fn test_flat_metrics_row() {
        let (text, quant, signals) = inputs(
            Some(NARRATIVE),
            &[("kpi_score", FieldValue::Number(0.8))],
        );
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        let row = result.flat_metrics();
        assert_eq!(row["hybrid_score"], Value::from(result.hybrid.score));
        assert_eq!(row["signal.score_kpi_score"], Value::from(80.0));
        assert!(row.contains_key("dim.performance"));
        assert_eq!(row["ext.analysis_mode"], Value::from("hybrid"));
        // JSON export keeps every column
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json.as_object().unwrap().len(), row.len());
    }

    #[test]
    fn test_flat_metrics_include_narrative_screen() {
        let narrative = "He is a young man who, like his father, works hard and delivers excellent results.";
        let (text, quant, signals) = inputs(Some(narrative), &[]);
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Text);
        let insights = result.narrative.as_ref().expect("narrative insights");
        assert!(insights.bias.gender_bias);
        let row = result.flat_metrics();
        assert_eq!(row["narrative_fairness_score"], Value::from(50));
        assert_eq!(row["narrative_is_fair"], Value::from(false));
        assert_eq!(row["text_consistency"], Value::from(insights.consistency.as_str()));
        assert!(row.contains_key("outlook_trend"));

        let (text, quant, signals) = inputs(None, &[("kpi_score", FieldValue::Number(90.0))]);
        let result = combiner().combine(&text, &quant, &signals, AnalysisMode::Hybrid);
        assert!(result.narrative.is_none());
        assert!(!result.flat_metrics().contains_key("narrative_is_fair"));
    }
}
