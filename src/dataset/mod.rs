mod types;

pub use types::{EvaluationRecord, FieldValue};

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Resolves a dataset reference into evaluation records.
///
/// Any error returned here is terminal for the job that asked for it.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load(&self, dataset_ref: &str) -> Result<Vec<EvaluationRecord>>;
}

/// Reads `.json` (array) and `.jsonl` (one record per line) files under a
/// root directory.
#[derive(Debug, Clone)]
pub struct JsonDatasetSource {
    root: PathBuf,
}

impl JsonDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a reference to a path under the root. Absolute paths and `..`
    /// components are rejected.
    pub fn resolve(&self, dataset_ref: &str) -> Result<PathBuf> {
        let relative = Path::new(dataset_ref);
        if dataset_ref.trim().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("Invalid dataset reference '{}'", dataset_ref);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DatasetSource for JsonDatasetSource {
    async fn load(&self, dataset_ref: &str) -> Result<Vec<EvaluationRecord>> {
        let path = self.resolve(dataset_ref)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read dataset at {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse dataset {}", path.display())),
            Some("jsonl") => parse_lines(&content)
                .with_context(|| format!("Failed to parse dataset {}", path.display())),
            _ => bail!(
                "Unsupported dataset format for {}: expected .json or .jsonl",
                path.display()
            ),
        }
    }
}

fn parse_lines(content: &str) -> Result<Vec<EvaluationRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

/// In-process datasets keyed by reference.
#[derive(Debug, Default)]
pub struct MemoryDatasets {
    datasets: RwLock<HashMap<String, Vec<EvaluationRecord>>>,
}

impl MemoryDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, dataset_ref: impl Into<String>, records: Vec<EvaluationRecord>) {
        self.datasets.write().await.insert(dataset_ref.into(), records);
    }
}

#[async_trait]
impl DatasetSource for MemoryDatasets {
    async fn load(&self, dataset_ref: &str) -> Result<Vec<EvaluationRecord>> {
        match self.datasets.read().await.get(dataset_ref) {
            Some(records) => Ok(records.clone()),
            None => bail!("Dataset '{}' not found", dataset_ref),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_json_array() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("q3.json"),
            r#"[{"subject_id": "a"}, {"subject_id": "b", "narrative": "clear"}]"#,
        )
        .unwrap();

        let source = JsonDatasetSource::new(dir.path());
        let records = source.load("q3.json").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].narrative.as_deref(), Some("clear"));
    }

    #[tokio::test]
    async fn test_load_jsonl_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("q3.jsonl"),
            "{\"subject_id\": \"a\"}\n\n{\"subject_id\": \"b\"}\n",
        )
        .unwrap();

        let records = JsonDatasetSource::new(dir.path()).load("q3.jsonl").await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.jsonl"), "{\"subject_id\": \"a\"}\n{oops\n").unwrap();

        let err = JsonDatasetSource::new(dir.path()).load("bad.jsonl").await.unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = JsonDatasetSource::new(dir.path()).load("nope.json").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset"));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("data.csv"), "subject_id\na\n").unwrap();
        let err = JsonDatasetSource::new(dir.path()).load("data.csv").await.unwrap_err();
        assert!(err.to_string().contains("Unsupported dataset format"));
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let source = JsonDatasetSource::new("/data");
        assert!(source.resolve("../etc/passwd").is_err());
        assert!(source.resolve("/etc/passwd").is_err());
        assert!(source.resolve("").is_err());
        assert_eq!(source.resolve("team/q3.json").unwrap(), PathBuf::from("/data/team/q3.json"));
    }

    #[tokio::test]
    async fn test_memory_datasets() {
        let datasets = MemoryDatasets::new();
        datasets
            .insert(
                "ds",
                vec![EvaluationRecord {
                    subject_id: "a".into(),
                    narrative: None,
                    fields: Default::default(),
                    attributes: Default::default(),
                }],
            )
            .await;
        assert_eq!(datasets.load("ds").await.unwrap().len(), 1);
        assert!(datasets.load("other").await.is_err());
    }
}
