use thiserror::Error;

/// Invalid configuration detected at load time. Carries every problem found,
/// not just the first.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid configuration: {}", .0.join("; "))]
pub struct ConfigError(pub Vec<String>);

impl ConfigError {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// Errors reported by a persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// The backing store could not be reached or written.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// A single record could not be scored. Recovered by skipping the record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordError {
    #[error("record has no subject id")]
    MissingSubject,

    #[error("field '{field}' of subject {subject_id} is not a finite number")]
    NonFiniteField { subject_id: String, field: String },

    #[error("scoring failed for subject {subject_id}: {reason}")]
    Scoring { subject_id: String, reason: String },
}

/// Errors surfaced synchronously by orchestrator calls.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job already exists: {0}")]
    Conflict(String),

    #[error("invalid job id '{0}': expected 1-64 characters of [A-Za-z0-9_-]")]
    InvalidJobId(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => OrchestratorError::NotFound(id),
            StoreError::Conflict(id) => OrchestratorError::Conflict(id),
            other => OrchestratorError::Store(other),
        }
    }
}
