pub mod auditor;
pub mod config;
pub mod report;
pub mod stats;
pub mod text_bias;

pub use auditor::{FairnessAuditor, ScoredSubject};
pub use config::{validate_fairness, FairnessConfig, FairnessThresholds};
pub use report::{AttributeAnalysis, AuditStatus, FairnessReport, IntersectionalAnalysis, RiskLevel};
pub use text_bias::{check_text_bias, BiasFinding, BiasKind, BiasSeverity, TextBiasCheck};
