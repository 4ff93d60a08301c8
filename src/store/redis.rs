//! Broker-backed Result Store: one Redis hash per execution, counters held
//! in dedicated keys updated with atomic INCR/INCRBY.

use super::{AggregateCounters, ResultStore};
use crate::error::StoreError;
use crate::job::{ExecutionRecord, ExecutionResult, ExecutionStatus};
use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;

const EXECUTION_PREFIX: &str = "sandkit:execution:";
const METRICS_PROCESSED: &str = "sandkit:metrics:total_processed";
const METRICS_FAILED: &str = "sandkit:metrics:total_failed";
const METRICS_DURATION: &str = "sandkit:metrics:total_duration_ms";
/// Record TTL (I4): 24 hours.
const RECORD_TTL_SECS: i64 = 86_400;

pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn key(id: &str) -> String {
        format!("{EXECUTION_PREFIX}{id}")
    }
}

#[async_trait]
impl ResultStore for RedisStore {
    async fn create(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let key = Self::key(&record.id);
        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("status", "queued"),
                    ("language", &record.language),
                    ("created_at", &record.created_at.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let _: () = conn
            .expire(&key, RECORD_TTL_SECS)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn mark_running(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset_multiple(
                Self::key(id),
                &[("status", "running"), ("updated_at", &Utc::now().to_rfc3339())],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn save_result(&self, id: &str, result: ExecutionResult) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let status = if result.succeeded() { "completed" } else { "failed" };
        let now = Utc::now().to_rfc3339();

        let _: () = conn
            .hset_multiple(
                Self::key(id),
                &[
                    ("status", status.to_string()),
                    ("stdout", result.stdout),
                    ("stderr", result.stderr),
                    ("exit_code", result.exit_code.to_string()),
                    ("duration_ms", result.duration_ms.to_string()),
                    ("timeout", result.timeout.to_string()),
                    ("error_type", result.error_type.unwrap_or_default()),
                    ("completed_at", now.clone()),
                    ("updated_at", now),
                ],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let _: () = conn
            .incr(METRICS_PROCESSED, 1)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if status == "failed" {
            let _: () = conn
                .incr(METRICS_FAILED, 1)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let _: () = conn
            .incr(METRICS_DURATION, result.duration_ms as i64)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn save_failure(&self, id: &str, error_type: &str, message: &str) -> Result<(), StoreError> {
        self.save_result(
            id,
            ExecutionResult {
                stdout: String::new(),
                stderr: message.to_string(),
                exit_code: -1,
                duration_ms: 0,
                timeout: false,
                error_type: Some(error_type.to_string()),
            },
        )
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let data: std::collections::HashMap<String, String> = conn
            .hgetall(Self::key(id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if data.is_empty() {
            return Ok(None);
        }

        let status = match data.get("status").map(String::as_str) {
            Some("queued") => ExecutionStatus::Queued,
            Some("running") => ExecutionStatus::Running,
            Some("completed") => ExecutionStatus::Completed,
            _ => ExecutionStatus::Failed,
        };

        let parse_time = |s: &str| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now())
        };

        Ok(Some(ExecutionRecord {
            id: id.to_string(),
            status,
            language: data.get("language").cloned().unwrap_or_default(),
            created_at: data.get("created_at").map(|s| parse_time(s)).unwrap_or_else(Utc::now),
            updated_at: data.get("updated_at").map(|s| parse_time(s)).unwrap_or_else(Utc::now),
            stdout: data.get("stdout").cloned(),
            stderr: data.get("stderr").cloned(),
            exit_code: data.get("exit_code").and_then(|s| s.parse().ok()),
            duration_ms: data.get("duration_ms").and_then(|s| s.parse().ok()),
            timeout: data.get("timeout").and_then(|s| s.parse().ok()),
            error_type: data.get("error_type").filter(|s| !s.is_empty()).cloned(),
            completed_at: data.get("completed_at").map(|s| parse_time(s)),
        }))
    }

    async fn metrics(&self) -> Result<AggregateCounters, StoreError> {
        let mut conn = self.conn().await?;
        let total_processed: u64 = conn.get(METRICS_PROCESSED).await.unwrap_or(0);
        let total_failed: u64 = conn.get(METRICS_FAILED).await.unwrap_or(0);
        let total_duration_ms: u64 = conn.get(METRICS_DURATION).await.unwrap_or(0);
        Ok(AggregateCounters {
            total_processed,
            total_failed,
            total_duration_ms,
        })
    }
}
