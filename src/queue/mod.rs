//! Component D — the Task Queue. Two interchangeable backends share this one
//! capability interface; callers (the Worker, the Dispatcher) never know
//! which is in play.

pub mod filesystem;
pub mod redis;

use crate::error::QueueError;
use crate::job::{ExecutionConfig, Job};
use async_trait::async_trait;

/// A durable FIFO of pending jobs with at-most-one-claimant semantics.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Appends a job to the pending set and creates its initial `queued`
    /// record. Returns the new job id.
    async fn submit(&self, code: String, language: String, config: ExecutionConfig) -> Result<String, QueueError>;

    /// Removes the oldest pending job and moves it to processing, blocking
    /// up to `wait_secs`. Returns `None` on a timeout with nothing pending.
    async fn claim(&self, wait_secs: u64) -> Result<Option<Job>, QueueError>;

    /// Advisory count of jobs still pending.
    async fn size(&self) -> Result<usize, QueueError>;

    /// Acknowledges that a claimed job reached a terminal write, releasing
    /// whatever processing-set entry the backend holds for it. A no-op for
    /// backends (like the broker one) that have no separate processing set.
    async fn ack(&self, id: &str) -> Result<(), QueueError>;
}
