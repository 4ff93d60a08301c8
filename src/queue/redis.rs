//! Broker-backed Task Queue: `RPUSH`/`BLPOP` against one Redis list for
//! atomic, blocking pop semantics — no separate processing set is needed
//! since `BLPOP` already removes the entry in one round trip.

use super::TaskQueue;
use crate::error::QueueError;
use crate::job::{ExecutionConfig, ExecutionRecord, Job};
use crate::store::ResultStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;

const QUEUE_KEY: &str = "sandkit:queue";

pub struct RedisQueue {
    client: redis::Client,
    store: Arc<dyn ResultStore>,
}

impl RedisQueue {
    pub fn new(redis_url: &str, store: Arc<dyn ResultStore>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(|e| QueueError::Broker(e.to_string()))?;
        Ok(Self { client, store })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::BackendUnavailable(e.to_string()))
    }
}

#[async_trait]
impl TaskQueue for RedisQueue {
    async fn submit(&self, code: String, language: String, config: ExecutionConfig) -> Result<String, QueueError> {
        let job = Job::new(language.clone(), code, config);
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(&job)?;

        let _: () = conn
            .rpush(QUEUE_KEY, payload)
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))?;

        self.store
            .create(ExecutionRecord::queued(&job.id, &language))
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))?;

        Ok(job.id)
    }

    async fn claim(&self, wait_secs: u64) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn().await?;
        let popped: Option<(String, String)> = conn
            .blpop(QUEUE_KEY, wait_secs as f64)
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))?;

        match popped {
            Some((_key, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn size(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn().await?;
        let len: usize = conn.llen(QUEUE_KEY).await.map_err(|e| QueueError::Broker(e.to_string()))?;
        Ok(len)
    }

    async fn ack(&self, _id: &str) -> Result<(), QueueError> {
        Ok(())
    }
}
