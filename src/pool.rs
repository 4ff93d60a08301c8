//! Component G — the Worker Pool. Spawns genuine OS child processes, not
//! tokio tasks: each child re-execs this same binary under the hidden
//! `worker` subcommand, so a runaway sandbox in one worker cannot corrupt
//! its neighbors or the pool supervisor.

use crate::metrics::PoolGauges;
use crate::queue::TaskQueue;
use crate::store::{AggregateCounters, ResultStore};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct PoolHealth {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PoolMetrics {
    pub total_processed: u64,
    pub total_failed: u64,
    pub average_duration_ms: u64,
    pub queue_size: usize,
    pub worker_count: usize,
}

pub struct WorkerPool {
    exe: PathBuf,
    worker_args: Vec<String>,
    /// Sentinel file each worker polls for in its claim loop. Created by
    /// `stop(true, ..)` to request a graceful drain, removed once the pool
    /// either finishes stopping or starts again.
    shutdown_path: PathBuf,
    children: Vec<Child>,
    queue: std::sync::Arc<dyn TaskQueue>,
    store: std::sync::Arc<dyn ResultStore>,
}

impl WorkerPool {
    pub fn new(
        worker_args: Vec<String>,
        queue: std::sync::Arc<dyn TaskQueue>,
        store: std::sync::Arc<dyn ResultStore>,
    ) -> Result<Self> {
        let exe = std::env::current_exe().context("failed to resolve own executable path")?;
        let shutdown_path = std::env::temp_dir().join(format!("sandkit-pool-{}.stop", std::process::id()));
        Ok(Self {
            exe,
            worker_args,
            shutdown_path,
            children: Vec::new(),
            queue,
            store,
        })
    }

    fn spawn_one(&self, index: usize) -> Result<Child> {
        let child = Command::new(&self.exe)
            .arg("worker")
            .args(&self.worker_args)
            .arg("--shutdown-file")
            .arg(&self.shutdown_path)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn worker-{index}"))?;

        info!(worker = index, pid = child.id(), "worker process started");
        Ok(child)
    }

    /// Spawns `count` worker processes. Intended to be called once at
    /// startup; use [`scale`](Self::scale) afterward.
    pub async fn start(&mut self, count: usize) -> Result<()> {
        info!(count, "starting worker pool");
        let _ = std::fs::remove_file(&self.shutdown_path);
        for i in 0..count {
            self.children.push(self.spawn_one(i)?);
        }
        Ok(())
    }

    /// Requests shutdown. If `graceful`, creates the shutdown sentinel file
    /// each worker's claim loop polls for, so no worker starts a new job
    /// after this point, then gives currently running jobs up to `grace` to
    /// finish their own deadline. Any worker still alive once `grace` elapses
    /// (or immediately, if `!graceful`) is force-killed.
    pub async fn stop(&mut self, graceful: bool, grace: Duration) {
        info!(graceful, "stopping worker pool");

        if graceful {
            let _ = tokio::fs::write(&self.shutdown_path, b"").await;
            for child in &mut self.children {
                let _ = timeout(grace, child.wait()).await;
            }
        }

        for child in &mut self.children {
            if child.try_wait().ok().flatten().is_none() {
                warn!(pid = child.id(), "force-killing surviving worker");
                let _ = child.kill().await;
            }
        }

        self.children.clear();
        let _ = tokio::fs::remove_file(&self.shutdown_path).await;
        info!("worker pool stopped");
    }

    /// Spawns or terminates children to reach `target`.
    pub async fn scale(&mut self, target: usize) -> Result<()> {
        let current = self.children.len();
        if target > current {
            for i in current..target {
                self.children.push(self.spawn_one(i)?);
            }
        } else if target < current {
            let mut removed = self.children.split_off(target);
            for child in &mut removed {
                let _ = child.kill().await;
            }
        }
        Ok(())
    }

    pub async fn health(&mut self) -> PoolHealth {
        let mut alive = 0;
        for child in &mut self.children {
            if child.try_wait().ok().flatten().is_none() {
                alive += 1;
            }
        }
        let total = self.children.len();
        PoolHealth { total, alive, dead: total - alive }
    }

    pub async fn metrics(&self) -> Result<PoolMetrics> {
        let AggregateCounters {
            total_processed,
            total_failed,
            total_duration_ms,
        } = self.store.metrics().await.context("failed to read aggregate counters")?;

        let average_duration_ms = if total_processed > 0 {
            total_duration_ms / total_processed
        } else {
            0
        };

        Ok(PoolMetrics {
            total_processed,
            total_failed,
            average_duration_ms,
            queue_size: self.queue.size().await.context("failed to read queue size")?,
            worker_count: self.children.len(),
        })
    }

    pub async fn gauges(&mut self) -> PoolGauges {
        let queue_size = self.queue.size().await.unwrap_or(0);
        let worker_count = self.children.len();
        let workers_alive = self.health().await.alive;
        PoolGauges { queue_size, worker_count, workers_alive }
    }
}
