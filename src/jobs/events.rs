//! Job lifecycle events and the notification bus they are broadcast on.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    AnalysisStarted {
        job_id: String,
        dataset_ref: String,
    },
    AnalysisProgress {
        job_id: String,
        progress: f64,
        processed: usize,
        total: usize,
        current_subject_id: String,
        /// `None` when the current record was skipped.
        current_score: Option<f64>,
    },
    AnalysisCompleted {
        job_id: String,
        total_processed: usize,
        average_score: f64,
    },
    AnalysisFailed {
        job_id: String,
        error: String,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::AnalysisStarted { job_id, .. }
            | JobEvent::AnalysisProgress { job_id, .. }
            | JobEvent::AnalysisCompleted { job_id, .. }
            | JobEvent::AnalysisFailed { job_id, .. } => job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::AnalysisCompleted { .. } | JobEvent::AnalysisFailed { .. }
        )
    }
}

/// Best-effort event fan-out. Errors are logged by the caller and never
/// affect the job.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn broadcast(&self, channel: &str, event: &JobEvent) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub channel: String,
    pub event: JobEvent,
}

/// In-process bus backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: broadcast::Sender<Envelope>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn broadcast(&self, channel: &str, event: &JobEvent) -> Result<()> {
        // Having no subscribers is not a delivery failure.
        let _ = self.sender.send(Envelope {
            channel: channel.to_string(),
            event: event.clone(),
        });
        Ok(())
    }
}

/// Writes every event to the tracing log as JSON.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn broadcast(&self, channel: &str, event: &JobEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(channel, job_id = event.job_id(), %payload, "job event");
        Ok(())
    }
}
