use std::sync::Arc;

use tracing::{debug, info};

use super::config::ScoringConfig;
use super::hybrid::{AnalysisMode, CompositeResult, HybridCombiner, HybridPolicy};
use super::quant::{compose, QuantitativeNormalizer};
use super::text::{analyze, DimensionSet};
use crate::dataset::{EvaluationRecord, FieldValue};
use crate::error::{ConfigError, RecordError};

/// Runs one record through text scoring, quantitative normalization and the
/// hybrid combiner. Built once from validated configuration and shared
/// read-only across jobs.
#[derive(Debug, Clone)]
pub struct Evaluator {
    dimensions: Arc<DimensionSet>,
    normalizer: QuantitativeNormalizer,
    combiner: HybridCombiner,
}

impl Evaluator {
    pub fn new(config: &ScoringConfig) -> Result<Self, ConfigError> {
        let dimensions = Arc::new(DimensionSet::new(config.dimensions.clone())?);
        Ok(Self {
            normalizer: QuantitativeNormalizer::new(&config.quantitative),
            combiner: HybridCombiner::new(Arc::clone(&dimensions), HybridPolicy::new(&config.hybrid)),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> &DimensionSet {
        &self.dimensions
    }

    pub fn evaluate(
        &self,
        record: &EvaluationRecord,
        mode: AnalysisMode,
    ) -> Result<CompositeResult, RecordError> {
        if record.subject_id.trim().is_empty() {
            return Err(RecordError::MissingSubject);
        }
        for (field, value) in &record.fields {
            if let FieldValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(RecordError::NonFiniteField {
                        subject_id: record.subject_id.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        let text = analyze(record.narrative.as_deref(), &self.dimensions).map_err(|e| {
            RecordError::Scoring {
                subject_id: record.subject_id.clone(),
                reason: e.to_string(),
            }
        })?;
        let signals = self.normalizer.extract(&record.fields);
        let quant = compose(&signals);

        let result = self.combiner.combine(&text, &quant, &signals, mode);
        debug!(
            subject = %record.subject_id,
            text = result.text.score,
            quant = result.quant.score,
            hybrid = result.hybrid.score,
            "evaluated record"
        );
        if let Some(bias) = result.narrative.as_ref().map(|n| &n.bias).filter(|b| !b.is_fair) {
            info!(
                subject = %record.subject_id,
                fairness_score = bias.fairness_score,
                findings = bias.findings.len(),
                "narrative flagged for biased wording"
            );
        }
        Ok(result)
    }
}
