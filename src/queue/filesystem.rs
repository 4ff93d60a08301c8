//! Filesystem-backed Task Queue: pending/processing directories of one JSON
//! file per job, moved between them with rename. A worker that loses the
//! rename race for a candidate simply tries the next one.

use super::TaskQueue;
use crate::error::QueueError;
use crate::job::{ExecutionConfig, ExecutionRecord, Job};
use crate::store::ResultStore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::time::sleep;

pub struct FileSystemQueue {
    pending_dir: PathBuf,
    processing_dir: PathBuf,
    store: Arc<dyn ResultStore>,
}

impl FileSystemQueue {
    pub async fn new(data_root: impl Into<PathBuf>, store: Arc<dyn ResultStore>) -> Result<Self, QueueError> {
        let data_root = data_root.into();
        let pending_dir = data_root.join("queue").join("pending");
        let processing_dir = data_root.join("queue").join("processing");
        fs::create_dir_all(&pending_dir).await?;
        fs::create_dir_all(&processing_dir).await?;
        Ok(Self { pending_dir, processing_dir, store })
    }

    fn file_name(job: &Job) -> String {
        format!("{}_{}.json", job.submitted_at.format("%Y%m%d_%H%M%S_%6f"), job.id)
    }
}

#[async_trait]
impl TaskQueue for FileSystemQueue {
    async fn submit(&self, code: String, language: String, config: ExecutionConfig) -> Result<String, QueueError> {
        let job = Job::new(language.clone(), code, config);
        let filename = Self::file_name(&job);
        let tmp_path = self.pending_dir.join(format!(".tmp_{filename}"));
        let target_path = self.pending_dir.join(&filename);

        fs::write(&tmp_path, serde_json::to_vec(&job)?).await?;
        fs::rename(&tmp_path, &target_path).await?;

        self.store
            .create(ExecutionRecord::queued(&job.id, &language))
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))?;

        Ok(job.id)
    }

    async fn claim(&self, wait_secs: u64) -> Result<Option<Job>, QueueError> {
        let deadline = Instant::now() + Duration::from_secs(wait_secs);

        loop {
            let mut entries = fs::read_dir(&self.pending_dir).await?;
            let mut candidates = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(".json") && !name.starts_with(".tmp_") {
                    candidates.push(name);
                }
            }
            candidates.sort();

            for name in candidates {
                let pending_path = self.pending_dir.join(&name);
                let processing_path = self.processing_dir.join(&name);

                match fs::rename(&pending_path, &processing_path).await {
                    Ok(()) => {
                        let bytes = fs::read(&processing_path).await?;
                        let job: Job = serde_json::from_slice(&bytes)?;
                        return Ok(Some(job));
                    }
                    Err(_) => {
                        // another worker won the race for this candidate
                        continue;
                    }
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn size(&self) -> Result<usize, QueueError> {
        let mut entries = fs::read_dir(&self.pending_dir).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".json") {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn ack(&self, id: &str) -> Result<(), QueueError> {
        let mut entries = fs::read_dir(&self.processing_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(&format!("_{id}.json")) {
                let _ = fs::remove_file(entry.path()).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ExecutionStatus;
    use crate::store::filesystem::FileSystemStore;
    use crate::store::MockResultStore;

    async fn new_queue() -> (FileSystemQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSystemStore::new(dir.path()).await.unwrap());
        let queue = FileSystemQueue::new(dir.path(), store).await.unwrap();
        (queue, dir)
    }

    #[tokio::test]
    async fn submit_then_claim_roundtrips() {
        let (queue, _dir) = new_queue().await;
        let id = queue
            .submit("print(1)".into(), "python".into(), ExecutionConfig::default())
            .await
            .unwrap();

        let job = queue.claim(1).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(queue.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn claim_times_out_when_empty() {
        let (queue, _dir) = new_queue().await;
        let job = queue.claim(1).await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn fifo_order_by_submission() {
        let (queue, _dir) = new_queue().await;
        let first = queue
            .submit("1".into(), "python".into(), ExecutionConfig::default())
            .await
            .unwrap();
        // ensure distinct filename timestamps
        sleep(Duration::from_millis(2)).await;
        let _second = queue
            .submit("2".into(), "python".into(), ExecutionConfig::default())
            .await
            .unwrap();

        let claimed = queue.claim(1).await.unwrap().unwrap();
        assert_eq!(claimed.id, first);
    }

    #[tokio::test]
    async fn ack_removes_processing_entry() {
        let (queue, _dir) = new_queue().await;
        let id = queue
            .submit("1".into(), "python".into(), ExecutionConfig::default())
            .await
            .unwrap();
        queue.claim(1).await.unwrap();
        queue.ack(&id).await.unwrap();

        let mut entries = fs::read_dir(&queue.processing_dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn submit_creates_exactly_one_queued_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock_store = MockResultStore::new();
        mock_store
            .expect_create()
            .times(1)
            .withf(|record| record.status == ExecutionStatus::Queued && record.language == "python")
            .returning(|_| Ok(()));

        let queue = FileSystemQueue::new(dir.path(), Arc::new(mock_store)).await.unwrap();
        let id = queue
            .submit("print(1)".into(), "python".into(), ExecutionConfig::default())
            .await
            .unwrap();
        assert!(!id.is_empty());
    }
}
