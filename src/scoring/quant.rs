//! Quantitative normalizer.
//!
//! Classifies row fields by name into grade/score/rate/count signals,
//! rescales each into 0-100, and composes them into a weighted score.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::QuantitativeConfig;
use super::factors::{parse_number, rescale_by_range, round1, RangeOp};
use super::text::NEUTRAL_SCORE;
use crate::dataset::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalCategory {
    Grade,
    Score,
    Rate,
    Count,
}

impl SignalCategory {
    pub fn weight(self) -> f64 {
        match self {
            SignalCategory::Grade => 0.4,
            SignalCategory::Score => 0.3,
            SignalCategory::Rate => 0.2,
            SignalCategory::Count => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalCategory::Grade => "grade",
            SignalCategory::Score => "score",
            SignalCategory::Rate => "rate",
            SignalCategory::Count => "count",
        }
    }

    /// Classify a field by substring tokens in its name. Checked in the
    /// order score, grade, rate, count.
    pub fn classify(field_name: &str) -> Option<Self> {
        let name = field_name.to_lowercase();
        let table: [(SignalCategory, &[&str]); 4] = [
            (SignalCategory::Score, &["score", "rating", "points", "점수", "평점"]),
            (SignalCategory::Grade, &["grade", "level", "tier", "evaluation", "등급", "평가"]),
            (SignalCategory::Rate, &["rate", "ratio", "percent", "pct", "%", "달성률", "비율"]),
            (SignalCategory::Count, &["count", "times", "number_of", "num_", "건수", "횟수"]),
        ];
        table
            .into_iter()
            .find(|(_, tokens)| tokens.iter().any(|t| name.contains(t)))
            .map(|(category, _)| category)
    }
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeSignal {
    pub field: String,
    pub category: SignalCategory,
    pub raw: String,
    /// 0-100
    pub score: f64,
}

/// Coarse bucket for how many signals were extractable from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    None,
    Low,
    Medium,
    High,
}

impl DataQuality {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => DataQuality::None,
            1..=2 => DataQuality::Low,
            3..=4 => DataQuality::Medium,
            _ => DataQuality::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataQuality::None => "none",
            DataQuality::Low => "low",
            DataQuality::Medium => "medium",
            DataQuality::High => "high",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub key: String,
    pub score: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantResult {
    pub score: f64,
    pub confidence: f64,
    pub data_quality: DataQuality,
    pub signal_count: usize,
    pub contributions: Vec<SignalContribution>,
}

// Keys are compared after uppercasing and removing whitespace.
const GRADE_TABLE: &[(&str, f64)] = &[
    ("S", 100.0),
    ("A+", 100.0), ("A", 95.0), ("A-", 90.0),
    ("B+", 85.0), ("B", 80.0), ("B-", 75.0),
    ("C+", 70.0), ("C", 65.0), ("C-", 60.0),
    ("D+", 55.0), ("D", 50.0), ("D-", 45.0),
    ("F", 30.0),
    ("1", 100.0), ("2", 80.0), ("3", 60.0), ("4", 40.0), ("5", 20.0),
    ("★★★", 100.0), ("★★", 90.0), ("★", 80.0),
    ("OUTSTANDING", 100.0), ("EXCELLENT", 90.0), ("GOOD", 75.0), ("AVERAGE", 60.0),
    ("POOR", 45.0), ("INSUFFICIENT", 30.0),
    ("HIGH", 85.0), ("MEDIUM", 65.0), ("MID", 65.0), ("LOW", 45.0),
    ("TOP10%", 95.0), ("TOP20%", 85.0), ("TOP30%", 75.0), ("TOP50%", 65.0),
    ("BOTTOM50%", 50.0), ("BOTTOM30%", 35.0),
    ("우수", 90.0), ("양호", 75.0), ("보통", 60.0), ("미흡", 45.0), ("부족", 30.0),
];

const QUALITATIVE_KEYWORDS: &[(&str, f64)] = &[
    ("EXCELLENT", 90.0),
    ("GOOD", 75.0),
    ("AVERAGE", 60.0),
    ("POOR", 45.0),
];

/// Rescales heterogeneous row fields into 0-100 signals.
#[derive(Debug, Clone)]
pub struct QuantitativeNormalizer {
    count_buckets: Vec<(RangeOp, f64)>,
}

impl QuantitativeNormalizer {
    /// Build from configuration. Buckets that fail to parse are dropped;
    /// `validate_scoring` reports them at startup.
    pub fn new(config: &QuantitativeConfig) -> Self {
        let count_buckets = config
            .count_buckets
            .iter()
            .filter_map(|b| RangeOp::parse(&b.range).ok().map(|r| (r, b.score)))
            .collect();
        Self { count_buckets }
    }

    /// Extract one signal per classifiable, non-empty field. Keys are
    /// `{category}_{field}`.
    pub fn extract(
        &self,
        fields: &BTreeMap<String, FieldValue>,
    ) -> BTreeMap<String, QuantitativeSignal> {
        let mut signals = BTreeMap::new();
        for (field, value) in fields {
            let Some(category) = SignalCategory::classify(field) else {
                continue;
            };
            let Some(raw) = value.as_text() else {
                continue;
            };
            let score = match category {
                SignalCategory::Grade => grade_to_score(&raw),
                SignalCategory::Score | SignalCategory::Rate => normalize_score(&raw),
                SignalCategory::Count => self.normalize_count(&raw),
            };
            debug!(field = %field, category = %category, raw = %raw, score, "extracted signal");
            signals.insert(
                format!("{}_{}", category, field),
                QuantitativeSignal {
                    field: field.clone(),
                    category,
                    raw,
                    score: round1(score),
                },
            );
        }
        signals
    }

    fn normalize_count(&self, raw: &str) -> f64 {
        let Some((count, _)) = parse_number(raw) else {
            return NEUTRAL_SCORE;
        };
        self.count_buckets
            .iter()
            .find(|(range, _)| range.matches(count))
            .map(|(_, score)| *score)
            .unwrap_or(NEUTRAL_SCORE)
    }
}

/// Convert a categorical or numeric grade token to 0-100.
///
/// Table lookup first, then numeric range rescale, then qualitative keyword
/// match, then 50.
pub fn grade_to_score(raw: &str) -> f64 {
    let key: String = raw.split_whitespace().collect::<String>().to_uppercase();
    if let Some((_, score)) = GRADE_TABLE.iter().find(|(k, _)| *k == key) {
        return *score;
    }
    if let Some((value, percent)) = parse_number(raw) {
        return if percent {
            value.clamp(0.0, 100.0)
        } else {
            rescale_by_range(value)
        };
    }
    QUALITATIVE_KEYWORDS
        .iter()
        .find(|(k, _)| key.contains(k))
        .map(|(_, score)| *score)
        .unwrap_or(NEUTRAL_SCORE)
}

/// Normalize a score or rate value to 0-100. Unparseable values score 50.
pub fn normalize_score(raw: &str) -> f64 {
    match parse_number(raw) {
        Some((value, true)) => value.clamp(0.0, 100.0),
        Some((value, false)) => rescale_by_range(value),
        None => NEUTRAL_SCORE,
    }
}

/// Weighted average over signals using the category weights
/// (grade 0.4, score 0.3, rate 0.2, count 0.1).
/// An empty signal set scores 50 with confidence 0 and quality "none".
pub fn compose(signals: &BTreeMap<String, QuantitativeSignal>) -> QuantResult {
    if signals.is_empty() {
        return QuantResult {
            score: NEUTRAL_SCORE,
            confidence: 0.0,
            data_quality: DataQuality::None,
            signal_count: 0,
            contributions: Vec::new(),
        };
    }

    let mut total = 0.0;
    let mut total_weight = 0.0;
    let mut contributions = Vec::with_capacity(signals.len());
    for (key, signal) in signals {
        let weight = signal.category.weight();
        total += signal.score * weight;
        total_weight += weight;
        contributions.push(SignalContribution {
            key: key.clone(),
            score: signal.score,
            weight,
            contribution: round1(signal.score * weight),
        });
    }

    QuantResult {
        score: round1((total / total_weight).clamp(0.0, 100.0)),
        confidence: round1((total_weight * 20.0).min(100.0)),
        data_quality: DataQuality::from_count(signals.len()),
        signal_count: signals.len(),
        contributions,
    }
}
