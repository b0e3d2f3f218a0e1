pub mod config;
pub mod engine;
pub mod factors;
pub mod grade;
pub mod hybrid;
pub mod lexicon;
pub mod outlook;
pub mod quant;
pub mod text;
pub mod validation;

pub use config::*;
pub use engine::Evaluator;
pub use factors::RangeOp;
pub use grade::Grade;
pub use hybrid::{AnalysisMode, CompositeResult, HybridCombiner, HybridPolicy};
pub use outlook::{PerformanceOutlook, Readiness, Trend};
pub use quant::{DataQuality, QuantResult, QuantitativeNormalizer, QuantitativeSignal, SignalCategory};
pub use text::{Consistency, DimensionScore, DimensionSet, NarrativeInsights, ScoreDistribution, TextResult};
pub use validation::validate_scoring;
