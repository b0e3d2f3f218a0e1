use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use atomic_write_file::AtomicWriteFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{completed_summaries, job_not_found, JobPatch, JobStore, ResultRecord};
use crate::error::StoreError;
use crate::jobs::{validate_job_id, AnalysisJob, JobSummary};

/// JSON files under a data directory:
///
/// ```text
/// <root>/jobs/<job_id>.json       one AnalysisJob, rewritten atomically
/// <root>/results/<job_id>.jsonl   one ResultRecord per line, append-only
/// ```
///
/// Writes are serialized within the process. Ids that are not valid job ids
/// never reach the filesystem and report `NotFound`.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    /// Subject ids already saved per job, loaded from disk on first use.
    /// Holding the lock serializes every write.
    subjects: Mutex<HashMap<String, HashSet<String>>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subjects: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_path(&self, job_id: &str) -> Result<PathBuf, StoreError> {
        validate_job_id(job_id).map_err(|_| job_not_found(job_id))?;
        Ok(self.root.join("jobs").join(format!("{}.json", job_id)))
    }

    fn results_path(&self, job_id: &str) -> Result<PathBuf, StoreError> {
        validate_job_id(job_id).map_err(|_| job_not_found(job_id))?;
        Ok(self.root.join("results").join(format!("{}.jsonl", job_id)))
    }

    async fn load_job(&self, job_id: &str) -> Result<AnalysisJob, StoreError> {
        let path = self.job_path(job_id)?;
        blocking(move || read_json::<AnalysisJob>(&path))
            .await?
            .ok_or_else(|| job_not_found(job_id))
    }

    async fn load_results(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        let path = self.results_path(job_id)?;
        blocking(move || read_json_lines::<ResultRecord>(&path)).await
    }

    async fn write<T>(&self, path: PathBuf, value: T) -> Result<(), StoreError>
    where
        T: Serialize + Send + 'static,
    {
        blocking(move || write_json(&path, &value)).await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unavailable(path, e)),
    };
    Ok(Some(serde_json::from_reader(file)?))
}

/// Empty when the file does not exist. Blank lines are ignored.
fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(unavailable(path, e)),
    };
    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| unavailable(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
    }
    let mut file = AtomicWriteFile::open(path).map_err(|e| unavailable(path, e))?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.commit().map_err(|e| unavailable(path, e))?;
    Ok(())
}

/// Append one record as a single line in a single write.
fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
    }
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| unavailable(path, e))?;
    file.write_all(&line).map_err(|e| unavailable(path, e))?;
    file.sync_data().map_err(|e| unavailable(path, e))
}

fn unavailable(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl JobStore for FileStore {
    async fn create_job(&self, job: AnalysisJob) -> Result<String, StoreError> {
        let _guard = self.subjects.lock().await;
        let path = self.job_path(&job.id)?;
        let existing = path.clone();
        if blocking(move || Ok(existing.exists())).await? {
            return Err(StoreError::Conflict(job.id));
        }
        let id = job.id.clone();
        self.write(path, job).await?;
        Ok(id)
    }

    async fn get_job(&self, job_id: &str) -> Result<AnalysisJob, StoreError> {
        self.load_job(job_id).await
    }

    async fn update_job(&self, job_id: &str, patch: JobPatch) -> Result<AnalysisJob, StoreError> {
        let _guard = self.subjects.lock().await;
        let mut job = self.load_job(job_id).await?;
        patch.apply(&mut job)?;
        self.write(self.job_path(job_id)?, job.clone()).await?;
        Ok(job)
    }

    async fn save_result(&self, record: ResultRecord) -> Result<(), StoreError> {
        let mut subjects = self.subjects.lock().await;
        self.load_job(&record.job_id).await?;
        if !subjects.contains_key(&record.job_id) {
            let saved = self
                .load_results(&record.job_id)
                .await?
                .into_iter()
                .map(|r| r.subject_id)
                .collect();
            subjects.insert(record.job_id.clone(), saved);
        }
        let seen = subjects.entry(record.job_id.clone()).or_default();
        if seen.contains(&record.subject_id) {
            return Err(StoreError::Conflict(format!(
                "result for subject {} in job {}",
                record.subject_id, record.job_id
            )));
        }
        let path = self.results_path(&record.job_id)?;
        let subject_id = record.subject_id.clone();
        blocking(move || append_json_line(&path, &record)).await?;
        seen.insert(subject_id);
        Ok(())
    }

    async fn list_results(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        self.load_job(job_id).await?;
        self.load_results(job_id).await
    }

    async fn list_completed_jobs(&self, limit: usize) -> Result<Vec<JobSummary>, StoreError> {
        let jobs = self.list_jobs().await?;
        Ok(completed_summaries(jobs.into_iter(), limit))
    }

    async fn list_jobs(&self) -> Result<Vec<AnalysisJob>, StoreError> {
        let dir = self.root.join("jobs");
        let mut jobs = blocking(move || {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(unavailable(&dir, e)),
            };
            let mut jobs = Vec::new();
            for entry in entries {
                let path = entry.map_err(|e| unavailable(&dir, e))?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(job) = read_json::<AnalysisJob>(&path)? {
                    jobs.push(job);
                }
            }
            Ok(jobs)
        })
        .await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }
}
