//! Dimension lexicon scorer.
//!
//! Scores a narrative against each weighted dimension by case-insensitive
//! substring matches on the dimension's positive and negative terms. This is
//! a deterministic heuristic, not a language model.

use serde::{Deserialize, Serialize};

use super::config::DimensionSpec;
use super::factors::round1;
use super::grade::Grade;
use super::outlook::{predict, PerformanceOutlook};
use super::validation::dimension_errors;
use crate::error::ConfigError;
use crate::fairness::text_bias::{check_text_bias, TextBiasCheck};

/// Score returned for an absent narrative.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Confidence never drops below this while a narrative is present.
pub const MIN_TEXT_CONFIDENCE: f64 = 50.0;

const MAX_EXEMPLARS: usize = 5;
const PLACEHOLDERS: &[&str] = &["", "null", "nan", "none"];

/// A validated, read-only set of dimensions. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct DimensionSet {
    specs: Vec<DimensionSpec>,
}

impl DimensionSet {
    /// Validate the weight-sum invariant and the lexicons before first use.
    pub fn new(specs: Vec<DimensionSpec>) -> Result<Self, ConfigError> {
        let errors = dimension_errors(&specs);
        if !errors.is_empty() {
            return Err(ConfigError(errors));
        }
        let specs = specs
            .into_iter()
            .map(|mut spec| {
                spec.positive = normalize_terms(&spec.positive);
                spec.negative = normalize_terms(&spec.negative);
                spec
            })
            .collect();
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[DimensionSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Result<&DimensionSpec, ConfigError> {
        self.specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::single(format!("unknown dimension '{}'", name)))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    /// 10-100
    pub score: f64,
    /// 0-100
    pub confidence: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
}

/// True when the narrative is missing or a placeholder such as "null"/"nan".
pub fn is_blank(text: Option<&str>) -> bool {
    match text {
        None => true,
        Some(t) => PLACEHOLDERS.contains(&t.trim().to_lowercase().as_str()),
    }
}

/// Score one narrative against one dimension.
///
/// `score = clamp(50 + min(8·pos, 45) − min(10·neg, 40) + lengthBonus, 10, 100)`
/// where `lengthBonus = min((len − 50) / 100 · 5, 10)` above 50 characters.
/// `confidence = clamp(min(12·(pos + neg), 80) + min(len / 20, 20), 0, 100)`.
pub fn score(text: Option<&str>, spec: &DimensionSpec) -> DimensionScore {
    let text = match text {
        Some(t) if !is_blank(Some(t)) => t,
        _ => {
            return DimensionScore {
                dimension: spec.name.clone(),
                score: NEUTRAL_SCORE,
                confidence: 0.0,
                positive_count: 0,
                negative_count: 0,
                positive_terms: Vec::new(),
                negative_terms: Vec::new(),
            }
        }
    };

    let lowered = text.to_lowercase();
    let positive = matched_terms(&lowered, &spec.positive);
    let negative = matched_terms(&lowered, &spec.negative);
    let pos = positive.len() as f64;
    let neg = negative.len() as f64;

    let len = text.chars().count() as f64;
    let length_bonus = if len > 50.0 {
        ((len - 50.0) / 100.0 * 5.0).min(10.0)
    } else {
        0.0
    };

    let raw = NEUTRAL_SCORE + (8.0 * pos).min(45.0) - (10.0 * neg).min(40.0) + length_bonus;
    let confidence = ((12.0 * (pos + neg)).min(80.0) + (len / 20.0).min(20.0)).clamp(0.0, 100.0);

    DimensionScore {
        dimension: spec.name.clone(),
        score: round1(raw.clamp(10.0, 100.0)),
        confidence: round1(confidence),
        positive_count: positive.len(),
        negative_count: negative.len(),
        positive_terms: positive.into_iter().take(MAX_EXEMPLARS).collect(),
        negative_terms: negative.into_iter().take(MAX_EXEMPLARS).collect(),
    }
}

fn matched_terms(lowered: &str, terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| lowered.contains(term.to_lowercase().as_str()))
        .cloned()
        .collect()
}

/// Weighted mean of dimension scores: Σ(score·weight) / Σ(weight), or 50
/// when the total weight is zero. A score for a dimension outside `set` is a
/// configuration error.
pub fn overall(scores: &[DimensionScore], set: &DimensionSet) -> Result<f64, ConfigError> {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for s in scores {
        let spec = set.get(&s.dimension)?;
        weighted += s.score * spec.weight;
        total_weight += spec.weight;
    }
    if total_weight > 0.0 {
        Ok(round1(weighted / total_weight))
    } else {
        Ok(NEUTRAL_SCORE)
    }
}

/// Spread of the dimension scores for one narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl ScoreDistribution {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self { mean: 0.0, std: 0.0, min: 0.0, max: 0.0, range: 0.0 };
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean: round1(mean),
            std: round1(variance.sqrt()),
            min: round1(min),
            max: round1(max),
            range: round1(max - min),
        }
    }
}

/// How evenly a narrative covers the dimensions, by standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// std below 10
    VeryConsistent,
    /// below 20
    Consistent,
    /// below 30
    SomewhatUneven,
    Uneven,
}

impl Consistency {
    pub fn from_std(std: f64) -> Self {
        if std < 10.0 {
            Consistency::VeryConsistent
        } else if std < 20.0 {
            Consistency::Consistent
        } else if std < 30.0 {
            Consistency::SomewhatUneven
        } else {
            Consistency::Uneven
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Consistency::VeryConsistent => "very_consistent",
            Consistency::Consistent => "consistent",
            Consistency::SomewhatUneven => "somewhat_uneven",
            Consistency::Uneven => "uneven",
        }
    }
}

/// Text channel confidence for a present narrative.
///
/// `clamp(max(0, 100 − 2·std) − 10·extremes, 50, 100)` where `extremes`
/// counts dimension scores below 20 or above 90. Uneven or extreme profiles
/// are trusted less.
pub fn consistency_confidence(scores: &[f64]) -> f64 {
    let std = ScoreDistribution::from_scores(scores).std;
    let extremes = scores.iter().filter(|s| **s < 20.0 || **s > 90.0).count() as f64;
    let base = (100.0 - 2.0 * std).max(0.0);
    round1((base - 10.0 * extremes).clamp(MIN_TEXT_CONFIDENCE, 100.0))
}

/// Derived views of a present narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeInsights {
    pub distribution: ScoreDistribution,
    pub consistency: Consistency,
    pub outlook: PerformanceOutlook,
    pub bias: TextBiasCheck,
}

/// The text channel of one record across every dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    pub available: bool,
    pub score: f64,
    pub grade: Grade,
    pub confidence: f64,
    pub dimensions: Vec<DimensionScore>,
    /// Up to three highest-scoring dimensions.
    pub strengths: Vec<String>,
    /// Up to three lowest-scoring dimensions, lowest first.
    pub improvement_areas: Vec<String>,
    /// `None` without a narrative.
    #[serde(default)]
    pub insights: Option<NarrativeInsights>,
}

/// Score a narrative against every dimension in the set.
pub fn analyze(text: Option<&str>, set: &DimensionSet) -> Result<TextResult, ConfigError> {
    let dimensions: Vec<DimensionScore> = set.specs().iter().map(|spec| score(text, spec)).collect();
    let composite = overall(&dimensions, set)?;

    let Some(narrative) = text.filter(|t| !is_blank(Some(*t))) else {
        return Ok(TextResult {
            available: false,
            score: composite,
            grade: Grade::from_score(composite),
            confidence: 0.0,
            dimensions,
            strengths: Vec::new(),
            improvement_areas: Vec::new(),
            insights: None,
        });
    };

    let scores: Vec<f64> = dimensions.iter().map(|d| d.score).collect();
    let distribution = ScoreDistribution::from_scores(&scores);
    let (strengths, improvement_areas) = rank_dimensions(&dimensions);
    let insights = NarrativeInsights {
        consistency: Consistency::from_std(distribution.std),
        distribution,
        outlook: predict(&dimensions, &improvement_areas),
        bias: check_text_bias(narrative),
    };

    Ok(TextResult {
        available: true,
        score: composite,
        grade: Grade::from_score(composite),
        confidence: consistency_confidence(&scores),
        dimensions,
        strengths,
        improvement_areas,
        insights: Some(insights),
    })
}

fn rank_dimensions(dimensions: &[DimensionScore]) -> (Vec<String>, Vec<String>) {
    let mut sorted: Vec<&DimensionScore> = dimensions.iter().collect();
    // Stable sort keeps lexicon order for ties.
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    let strengths = sorted.iter().take(3).map(|d| d.dimension.clone()).collect();
    let improvements = sorted
        .iter()
        .rev()
        .take(3)
        .map(|d| d.dimension.clone())
        .collect();
    (strengths, improvements)
}
