//! Persistence gateway for jobs and their results.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::EvaluationRecord;
use crate::error::StoreError;
use crate::fairness::ScoredSubject;
use crate::jobs::{AnalysisJob, JobStatus, JobSummary};
use crate::scoring::CompositeResult;

/// One persisted evaluation under a job. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: String,
    pub subject_id: String,
    pub result: CompositeResult,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(job_id: impl Into<String>, record: &EvaluationRecord, result: CompositeResult) -> Self {
        Self {
            job_id: job_id.into(),
            subject_id: record.subject_id.clone(),
            result,
            attributes: record.attribute_labels(),
            created_at: Utc::now(),
        }
    }

    pub fn hybrid_score(&self) -> f64 {
        self.result.hybrid.score
    }

    /// Flat labelled row: subject id, protected attributes and every metric.
    pub fn payload(&self) -> BTreeMap<String, Value> {
        let mut row = self.result.flat_metrics();
        row.insert("subject_id".to_string(), Value::from(self.subject_id.as_str()));
        for (k, v) in &self.attributes {
            row.insert(format!("attr.{}", k), Value::from(v.as_str()));
        }
        row
    }

    pub fn to_scored_subject(&self) -> ScoredSubject {
        ScoredSubject {
            subject_id: self.subject_id.clone(),
            score: self.hybrid_score(),
            attributes: self.attributes.clone(),
        }
    }
}

/// Partial update applied by `update_job`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub processed_count: Option<usize>,
    pub skipped_count: Option<usize>,
    pub total_count: Option<usize>,
    pub progress: Option<f64>,
    pub average_score: Option<f64>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn started(total: usize) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            total_count: Some(total),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn progress(processed: usize, skipped: usize, progress: f64) -> Self {
        Self {
            processed_count: Some(processed),
            skipped_count: Some(skipped),
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn completed(average_score: Option<f64>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100.0),
            average_score,
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Apply to `job`, enforcing the status state machine. Any patch to a
    /// job in a terminal state is rejected.
    pub fn apply(self, job: &mut AnalysisJob) -> Result<(), StoreError> {
        let next = self.status.unwrap_or(job.status);
        if !job.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                id: job.id.clone(),
                from: job.status.to_string(),
                to: next.to_string(),
            });
        }
        job.status = next;
        if let Some(v) = self.processed_count {
            job.processed_count = v;
        }
        if let Some(v) = self.skipped_count {
            job.skipped_count = v;
        }
        if let Some(v) = self.total_count {
            job.total_count = v;
        }
        if let Some(v) = self.progress {
            job.progress = v.clamp(0.0, 100.0);
        }
        if self.average_score.is_some() {
            job.average_score = self.average_score;
        }
        if self.error.is_some() {
            job.error = self.error;
        }
        if self.started_at.is_some() {
            job.started_at = self.started_at;
        }
        if self.completed_at.is_some() {
            job.completed_at = self.completed_at;
        }
        job.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. A duplicate id is `StoreError::Conflict`.
    async fn create_job(&self, job: AnalysisJob) -> Result<String, StoreError>;

    async fn get_job(&self, job_id: &str) -> Result<AnalysisJob, StoreError>;

    async fn update_job(&self, job_id: &str, patch: JobPatch) -> Result<AnalysisJob, StoreError>;

    /// Append one result. A second result for the same (job, subject) is
    /// `StoreError::Conflict`.
    async fn save_result(&self, record: ResultRecord) -> Result<(), StoreError>;

    /// Results in insertion order.
    async fn list_results(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError>;

    /// Completed jobs, most recently completed first.
    async fn list_completed_jobs(&self, limit: usize) -> Result<Vec<JobSummary>, StoreError>;

    /// Every job, oldest first.
    async fn list_jobs(&self) -> Result<Vec<AnalysisJob>, StoreError>;
}

fn job_not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        kind: "job",
        id: id.to_string(),
    }
}

fn completed_summaries(jobs: impl Iterator<Item = AnalysisJob>, limit: usize) -> Vec<JobSummary> {
    let mut done: Vec<AnalysisJob> = jobs.filter(|j| j.status == JobStatus::Completed).collect();
    done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    done.iter().take(limit).map(JobSummary::from).collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_patch_rejects_backward_transition() {
        let mut j = job("j");
        JobPatch::started(3).apply(&mut j).unwrap();
        let err = JobPatch {
            status: Some(JobStatus::Queued),
            ..JobPatch::default()
        }
        .apply(&mut j)
        .unwrap_err();
        assert!(err.to_string().contains("processing -> queued"));
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let mut j = job("j");
        JobPatch::started(3).apply(&mut j).unwrap();
        JobPatch::progress(1, 1, 66.7).apply(&mut j).unwrap();
        assert_eq!(j.total_count, 3);
        assert_eq!(j.processed_count, 1);
        assert_eq!(j.skipped_count, 1);
        assert_eq!(j.status, JobStatus::Processing);
        assert!(j.started_at.is_some());
    }

    #[test]
    fn test_queued_job_can_fail() {
        let mut j = job("j");
        JobPatch::failed("dataset missing").apply(&mut j).unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error.as_deref(), Some("dataset missing"));
    }

    #[test]
    fn test_payload_is_flat() {
        let r = result("j", "s1");
        let row = r.payload();
        assert_eq!(row["subject_id"], "s1");
        assert_eq!(row["attr.gender"], "F");
        assert_eq!(row["hybrid_score"], Value::from(r.hybrid_score()));
        assert!(row.values().all(|v| !v.is_object() && !v.is_array()));
    }
}
