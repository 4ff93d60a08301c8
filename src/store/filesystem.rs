//! Filesystem-backed Result Store: one directory per execution, status
//! updates via temp-write-then-rename, counters guarded by a cross-process
//! spinlock built from an exclusive-create lockfile.

use super::{AggregateCounters, ResultStore};
use crate::error::StoreError;
use crate::job::{ExecutionRecord, ExecutionResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;

pub struct FileSystemStore {
    executions_dir: PathBuf,
    metrics_dir: PathBuf,
}

impl FileSystemStore {
    pub async fn new(data_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let executions_dir = data_root.as_ref().join("executions");
        let metrics_dir = data_root.as_ref().join("metrics");
        fs::create_dir_all(&executions_dir).await?;
        fs::create_dir_all(&metrics_dir).await?;
        Ok(Self { executions_dir, metrics_dir })
    }

    fn execution_dir(&self, id: &str) -> PathBuf {
        self.executions_dir.join(id)
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_record(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        let status_path = self.execution_dir(id).join("status.json");
        match fs::read(&status_path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let dir = self.execution_dir(&record.id);
        fs::create_dir_all(&dir).await?;
        let status_path = dir.join("status.json");
        Self::write_atomic(&status_path, serde_json::to_string_pretty(record)?.as_bytes()).await
    }

    /// Acquires a simple cross-process lock by exclusively creating a
    /// lockfile, retrying with backoff. Released by removing the file.
    async fn with_counters_lock<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(AggregateCounters) -> (AggregateCounters, T),
    {
        let lock_path = self.metrics_dir.join(".counters.lock");
        let counters_path = self.metrics_dir.join("counters.json");

        let mut attempts = 0;
        loop {
            match fs::OpenOptions::new().create_new(true).write(true).open(&lock_path).await {
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts > 200 {
                        // A prior holder likely crashed while holding the
                        // lock; break the stale lock rather than hang forever.
                        let _ = fs::remove_file(&lock_path).await;
                        continue;
                    }
                    sleep(Duration::from_millis(10)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let result = async {
            let current = match fs::read(&counters_path).await {
                Ok(bytes) => serde_json::from_slice(&bytes)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => AggregateCounters::default(),
                Err(e) => return Err(StoreError::from(e)),
            };
            let (updated, ret) = f(current);
            Self::write_atomic(&counters_path, serde_json::to_string_pretty(&updated)?.as_bytes()).await?;
            Ok(ret)
        }
        .await;

        let _ = fs::remove_file(&lock_path).await;
        result
    }
}

#[async_trait]
impl ResultStore for FileSystemStore {
    async fn create(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        self.write_record(&record).await
    }

    async fn mark_running(&self, id: &str) -> Result<(), StoreError> {
        let mut record = self.read_record(id).await?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.mark_running();
        self.write_record(&record).await
    }

    async fn save_result(&self, id: &str, result: ExecutionResult) -> Result<(), StoreError> {
        let mut record = self.read_record(id).await?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.mark_terminal(
            result.stdout.clone(),
            result.stderr.clone(),
            result.exit_code,
            result.duration_ms,
            result.timeout,
            result.error_type.clone(),
        );
        let dir = self.execution_dir(id);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join("stdout.txt"), &result.stdout).await?;
        fs::write(dir.join("stderr.txt"), &result.stderr).await?;
        self.write_record(&record).await?;

        let failed = record.status == crate::job::ExecutionStatus::Failed;
        let duration_ms = result.duration_ms;
        self.with_counters_lock(|mut counters| {
            counters.total_processed += 1;
            if failed {
                counters.total_failed += 1;
            }
            counters.total_duration_ms += duration_ms;
            (counters, ())
        })
        .await
    }

    async fn save_failure(&self, id: &str, error_type: &str, message: &str) -> Result<(), StoreError> {
        let mut record = self.read_record(id).await?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.mark_failed(error_type, message);
        self.write_record(&record).await?;
        self.with_counters_lock(|mut counters| {
            counters.total_processed += 1;
            counters.total_failed += 1;
            (counters, ())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        self.read_record(id).await
    }

    async fn metrics(&self) -> Result<AggregateCounters, StoreError> {
        let path = self.metrics_dir.join("counters.json");
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AggregateCounters::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ExecutionStatus;

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).await.unwrap();
        let record = ExecutionRecord::queued("job-1", "python");
        store.create(record).await.unwrap();

        let fetched = store.get("job-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Queued);
    }

    #[tokio::test]
    async fn save_result_updates_counters() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path()).await.unwrap();
        store.create(ExecutionRecord::queued("job-1", "python")).await.unwrap();

        store
            .save_result(
                "job-1",
                ExecutionResult {
                    stdout: "hi".into(),
                    stderr: String::new(),
                    exit_code: 0,
                    duration_ms: 42,
                    timeout: false,
                    error_type: None,
                },
            )
            .await
            .unwrap();

        let record = store.get("job-1").await.unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);

        let counters = store.metrics().await.unwrap();
        assert_eq!(counters.total_processed, 1);
        assert_eq!(counters.total_failed, 0);
        assert_eq!(counters.total_duration_ms, 42);
    }

    // Plain #[test] + tokio_test::block_on rather than #[tokio::test]: this
    // one needs no I/O driver, just a runtime to poll the future on.
    #[test]
    fn missing_record_errors() {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let store = FileSystemStore::new(dir.path()).await.unwrap();
            let err = store.mark_running("nope").await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)));
        });
    }
}
