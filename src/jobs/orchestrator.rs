use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::FutureExt;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::config::JobsConfig;
use super::events::{JobEvent, LogNotifier, Notifier};
use super::executor::TaskSpawner;
use super::types::{validate_job_id, AnalysisJob, JobOptions, JobSummary, SubmitRequest};
use crate::dataset::DatasetSource;
use crate::error::{ConfigError, OrchestratorError, StoreError};
use crate::fairness::{FairnessAuditor, FairnessReport, ScoredSubject};
use crate::scoring::factors::round1;
use crate::scoring::Evaluator;
use crate::store::{JobPatch, JobStore, ResultRecord};

/// Backoff for transient result-save failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay: Duration,
    pub retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            max_delay: Duration::from_secs(5),
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub default_sample_size: usize,
    pub throttle: Duration,
    pub channel: String,
    pub retry: RetryPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(config: &JobsConfig) -> Result<Self, ConfigError> {
        let errors = super::config::validate_jobs(config);
        if !errors.is_empty() {
            return Err(ConfigError(errors));
        }
        Ok(Self {
            default_sample_size: config.sample_size,
            throttle: config.throttle().map_err(|e| ConfigError::single(e.to_string()))?,
            channel: config.channel.clone(),
            retry: RetryPolicy::default(),
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_sample_size: 10,
            throttle: Duration::from_millis(100),
            channel: "analysis".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Owns the lifecycle of batch evaluation jobs.
///
/// `submit` persists a queued job and hands the evaluation loop to the
/// [`TaskSpawner`]; everything that happens afterwards is observable only
/// through job state and notifications.
#[derive(Clone)]
pub struct Orchestrator {
    evaluator: Arc<Evaluator>,
    auditor: Arc<FairnessAuditor>,
    store: Arc<dyn JobStore>,
    datasets: Arc<dyn DatasetSource>,
    notifier: Arc<dyn Notifier>,
    spawner: Arc<dyn TaskSpawner>,
    settings: Arc<OrchestratorSettings>,
}

impl Orchestrator {
    pub fn new(
        evaluator: Arc<Evaluator>,
        store: Arc<dyn JobStore>,
        datasets: Arc<dyn DatasetSource>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        Self {
            evaluator,
            auditor: Arc::new(FairnessAuditor::default()),
            store,
            datasets,
            notifier: Arc::new(LogNotifier),
            spawner,
            settings: Arc::new(OrchestratorSettings::default()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_auditor(mut self, auditor: FairnessAuditor) -> Self {
        self.auditor = Arc::new(auditor);
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Create a queued job and schedule its evaluation loop. Returns the job
    /// id without waiting for any record to be processed.
    pub async fn submit(&self, request: SubmitRequest) -> Result<String, OrchestratorError> {
        let job_id = match request.job_id {
            Some(id) => {
                validate_job_id(&id)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let options = JobOptions {
            sample_size: request
                .sample_size
                .unwrap_or(self.settings.default_sample_size),
            mode: request.mode.unwrap_or_default(),
            throttle_ms: request
                .throttle
                .unwrap_or(self.settings.throttle)
                .as_millis()
                .try_into()
                .unwrap_or(u64::MAX),
        };
        let job = AnalysisJob::new(job_id.clone(), request.dataset_ref.clone(), options);
        self.store.create_job(job).await?;
        info!(job_id = %job_id, dataset = %request.dataset_ref, "job queued");

        let this = self.clone();
        let id = job_id.clone();
        self.spawner.spawn(async move { this.run_job(id).await }.boxed());

        Ok(job_id)
    }

    pub async fn status(&self, job_id: &str) -> Result<AnalysisJob, OrchestratorError> {
        Ok(self.store.get_job(job_id).await?)
    }

    pub async fn results(&self, job_id: &str) -> Result<Vec<ResultRecord>, OrchestratorError> {
        Ok(self.store.list_results(job_id).await?)
    }

    pub async fn completed_jobs(&self, limit: usize) -> Result<Vec<JobSummary>, OrchestratorError> {
        Ok(self.store.list_completed_jobs(limit).await?)
    }

    pub async fn jobs(&self) -> Result<Vec<AnalysisJob>, OrchestratorError> {
        Ok(self.store.list_jobs().await?)
    }

    /// Run the fairness auditor over a job's persisted results.
    pub async fn audit(
        &self,
        job_id: &str,
        attributes: &[String],
    ) -> Result<FairnessReport, OrchestratorError> {
        let results = self.store.list_results(job_id).await?;
        let batch: Vec<ScoredSubject> = results.iter().map(ResultRecord::to_scored_subject).collect();
        Ok(self.auditor.audit(&batch, attributes))
    }

    /// Mark queued or processing jobs with no update for `older_than` as
    /// failed. Only runs when called. Returns the ids that were marked.
    pub async fn reconcile_stale(&self, older_than: Duration) -> Result<Vec<String>, OrchestratorError> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window));
        let Some(cutoff) = cutoff else {
            return Ok(Vec::new());
        };

        let mut marked = Vec::new();
        for job in self.store.list_jobs().await? {
            if job.status.is_terminal() || job.updated_at >= cutoff {
                continue;
            }
            let message = format!(
                "abandoned: no progress since {}",
                job.updated_at.to_rfc3339()
            );
            match self.store.update_job(&job.id, JobPatch::failed(message.clone())).await {
                Ok(_) => {
                    warn!(job_id = %job.id, "marked stale job as failed");
                    self.notify(JobEvent::AnalysisFailed {
                        job_id: job.id.clone(),
                        error: message,
                    })
                    .await;
                    marked.push(job.id);
                }
                // Finished between the listing and the update.
                Err(StoreError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(marked)
    }

    #[instrument(skip(self))]
    async fn run_job(&self, job_id: String) {
        // A panic must still leave the job in a terminal state.
        let outcome = AssertUnwindSafe(self.execute(&job_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(anyhow!("job task panicked: {}", panic_message(&*panic))));
        if let Err(err) = outcome {
            let message = format!("{:#}", err);
            warn!(error = %message, "job failed");
            if let Err(e) = self.store.update_job(&job_id, JobPatch::failed(message.clone())).await {
                error!(error = %e, "could not record job failure");
            }
            self.notify(JobEvent::AnalysisFailed {
                job_id,
                error: message,
            })
            .await;
        }
    }

    async fn execute(&self, job_id: &str) -> Result<()> {
        let job = self.store.get_job(job_id).await.context("Failed to load job")?;
        let records = self
            .datasets
            .load(&job.dataset_ref)
            .await
            .with_context(|| format!("Failed to load dataset '{}'", job.dataset_ref))?;

        let sample: Vec<_> = records.into_iter().take(job.options.sample_size).collect();
        let total = sample.len();
        self.store
            .update_job(job_id, JobPatch::started(total))
            .await
            .context("Failed to mark job as processing")?;
        info!(total, mode = %job.options.mode, "job started");
        self.notify(JobEvent::AnalysisStarted {
            job_id: job_id.to_string(),
            dataset_ref: job.dataset_ref.clone(),
        })
        .await;

        let throttle = job.options.throttle();
        let mut processed = 0usize;
        let mut skipped = 0usize;
        let mut score_sum = 0.0;

        for record in &sample {
            let mut current_score = None;
            match self.evaluator.evaluate(record, job.options.mode) {
                Ok(result) => {
                    let score = result.hybrid.score;
                    match self.save_result(ResultRecord::new(job_id, record, result)).await {
                        Ok(()) => {
                            processed += 1;
                            score_sum += score;
                            current_score = Some(score);
                        }
                        Err(StoreError::Conflict(reason)) => {
                            warn!(subject = %record.subject_id, %reason, "duplicate result, skipping record");
                            skipped += 1;
                        }
                        Err(e) => {
                            return Err(e).with_context(|| {
                                format!("Failed to save result for subject {}", record.subject_id)
                            })
                        }
                    }
                }
                Err(e) => {
                    warn!(subject = %record.subject_id, error = %e, "skipping record");
                    skipped += 1;
                }
            }

            let progress = round1((processed + skipped) as f64 / total as f64 * 100.0);
            self.store
                .update_job(job_id, JobPatch::progress(processed, skipped, progress))
                .await
                .context("Failed to update job progress")?;
            debug!(subject = %record.subject_id, progress, "record done");
            self.notify(JobEvent::AnalysisProgress {
                job_id: job_id.to_string(),
                progress,
                processed,
                total,
                current_subject_id: record.subject_id.clone(),
                current_score,
            })
            .await;

            if !throttle.is_zero() {
                tokio::time::sleep(throttle).await;
            }
        }

        let average = (processed > 0).then(|| round1(score_sum / processed as f64));
        self.store
            .update_job(job_id, JobPatch::completed(average))
            .await
            .context("Failed to mark job as completed")?;
        info!(processed, skipped, average = average.unwrap_or(0.0), "job completed");
        self.notify(JobEvent::AnalysisCompleted {
            job_id: job_id.to_string(),
            total_processed: processed,
            average_score: average.unwrap_or(0.0),
        })
        .await;
        Ok(())
    }

    async fn save_result(&self, record: ResultRecord) -> Result<(), StoreError> {
        let policy = self.settings.retry;
        let strategy = ExponentialBackoff::from_millis(policy.base_delay_ms)
            .max_delay(policy.max_delay)
            .take(policy.retries);

        RetryIf::spawn(
            strategy,
            || self.store.save_result(record.clone()),
            |e: &StoreError| {
                if e.is_transient() {
                    warn!(error = %e, "result save failed, retrying");
                }
                e.is_transient()
            },
        )
        .await
    }

    async fn notify(&self, event: JobEvent) {
        if let Err(e) = self.notifier.broadcast(&self.settings.channel, &event).await {
            warn!(error = %e, job_id = event.job_id(), "notification failed");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
