pub mod config;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod types;

pub use config::{validate_jobs, JobsConfig};
pub use events::{ChannelNotifier, Envelope, JobEvent, LogNotifier, Notifier};
pub use executor::{DeferredSpawner, JobFuture, TaskSpawner, TokioSpawner};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RetryPolicy};
pub use types::{validate_job_id, AnalysisJob, JobOptions, JobStatus, JobSummary, SubmitRequest};
