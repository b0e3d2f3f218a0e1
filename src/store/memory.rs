use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{completed_summaries, job_not_found, JobPatch, JobStore, ResultRecord};
use crate::error::StoreError;
use crate::jobs::{AnalysisJob, JobSummary};

/// Process-local store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<String, AnalysisJob>>,
    results: RwLock<HashMap<String, Vec<ResultRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, job: AnalysisJob) -> Result<String, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(job.id));
        }
        let id = job.id.clone();
        jobs.insert(id.clone(), job);
        Ok(id)
    }

    async fn get_job(&self, job_id: &str) -> Result<AnalysisJob, StoreError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| job_not_found(job_id))
    }

    async fn update_job(&self, job_id: &str, patch: JobPatch) -> Result<AnalysisJob, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| job_not_found(job_id))?;
        // Apply to a copy so a rejected patch leaves the stored job intact.
        let mut updated = job.clone();
        patch.apply(&mut updated)?;
        *job = updated.clone();
        Ok(updated)
    }

    async fn save_result(&self, record: ResultRecord) -> Result<(), StoreError> {
        if !self.jobs.read().await.contains_key(&record.job_id) {
            return Err(job_not_found(&record.job_id));
        }
        let mut results = self.results.write().await;
        let entries = results.entry(record.job_id.clone()).or_default();
        if entries.iter().any(|r| r.subject_id == record.subject_id) {
            return Err(StoreError::Conflict(format!(
                "result for subject {} in job {}",
                record.subject_id, record.job_id
            )));
        }
        entries.push(record);
        Ok(())
    }

    async fn list_results(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        if !self.jobs.read().await.contains_key(job_id) {
            return Err(job_not_found(job_id));
        }
        Ok(self
            .results
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_completed_jobs(&self, limit: usize) -> Result<Vec<JobSummary>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(completed_summaries(jobs.values().cloned(), limit))
    }

    async fn list_jobs(&self) -> Result<Vec<AnalysisJob>, StoreError> {
        let mut jobs: Vec<AnalysisJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::exercise_store;
    use super::*;

    #[tokio::test]
    async fn test_memory_store_contract() {
        exercise_store(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_results_scoped_per_job() {
        use super::super::test_support::{job, result};
        let store = MemoryStore::new();
        store.create_job(job("a")).await.unwrap();
        store.create_job(job("b")).await.unwrap();
        store.save_result(result("a", "s1")).await.unwrap();
        // same subject under another job is fine
        store.save_result(result("b", "s1")).await.unwrap();
        assert_eq!(store.list_results("a").await.unwrap().len(), 1);
        assert_eq!(store.list_results("b").await.unwrap().len(), 1);
    }
}
