use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;
use crate::scoring::AnalysisMode;

const MAX_JOB_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// `queued -> processing -> {completed, failed}`, plus `queued -> failed`
    /// for jobs that fail before they start. Non-terminal states may be
    /// re-applied; nothing leaves a terminal state.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Queued)
                | (Queued, Processing)
                | (Queued, Failed)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved per-job options, persisted with the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Upper bound on records evaluated from the dataset.
    pub sample_size: usize,
    pub mode: AnalysisMode,
    /// Delay between records, in milliseconds.
    pub throttle_ms: u64,
}

impl JobOptions {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Caller input for `Orchestrator::submit`. Unset fields fall back to the
/// `jobs` configuration.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub dataset_ref: String,
    pub job_id: Option<String>,
    pub sample_size: Option<usize>,
    pub mode: Option<AnalysisMode>,
    pub throttle: Option<Duration>,
}

impl SubmitRequest {
    pub fn new(dataset_ref: impl Into<String>) -> Self {
        Self {
            dataset_ref: dataset_ref.into(),
            ..Self::default()
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: String,
    pub dataset_ref: String,
    pub status: JobStatus,
    pub options: JobOptions,
    pub processed_count: usize,
    #[serde(default)]
    pub skipped_count: usize,
    pub total_count: usize,
    /// 0-100
    pub progress: f64,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    pub fn new(id: impl Into<String>, dataset_ref: impl Into<String>, options: JobOptions) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            dataset_ref: dataset_ref.into(),
            status: JobStatus::Queued,
            options,
            processed_count: 0,
            skipped_count: 0,
            total_count: 0,
            progress: 0.0,
            average_score: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Listing row for finished jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub dataset_ref: String,
    pub status: JobStatus,
    pub processed_count: usize,
    pub total_count: usize,
    pub average_score: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&AnalysisJob> for JobSummary {
    fn from(job: &AnalysisJob) -> Self {
        Self {
            id: job.id.clone(),
            dataset_ref: job.dataset_ref.clone(),
            status: job.status,
            processed_count: job.processed_count,
            total_count: job.total_count,
            average_score: job.average_score,
            completed_at: job.completed_at,
        }
    }
}

/// Job ids are 1-64 characters of `[A-Za-z0-9_-]`.
pub fn validate_job_id(id: &str) -> Result<(), OrchestratorError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_JOB_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidJobId(id.to_string()))
    }
}
