//! Component E — the Result Store. Tracks each job's status record across
//! its lifetime and the process-wide aggregate counters.

pub mod filesystem;
pub mod redis;

use crate::error::StoreError;
use crate::job::{ExecutionRecord, ExecutionResult};
use async_trait::async_trait;

/// Process-wide counters, incremented on every terminal write (I5: they are
/// monotonically non-decreasing, even across backend restarts).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AggregateCounters {
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_duration_ms: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Creates the initial `queued` record for a freshly submitted job.
    async fn create(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    /// Transitions a record to `running`.
    async fn mark_running(&self, id: &str) -> Result<(), StoreError>;

    /// Applies the one terminal write for a job id and folds it into the
    /// aggregate counters.
    async fn save_result(&self, id: &str, result: ExecutionResult) -> Result<(), StoreError>;

    /// Writes a terminal `failed` record directly, for errors that never
    /// reach the sandbox (e.g. an unsupported language).
    async fn save_failure(&self, id: &str, error_type: &str, message: &str) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError>;

    async fn metrics(&self) -> Result<AggregateCounters, StoreError>;
}
