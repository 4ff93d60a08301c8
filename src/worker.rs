//! Component F — a single claim/execute/persist loop. Runs as its own OS
//! process under the Worker Pool; a job failure never brings the loop down,
//! it is always recovered into a terminal record.

use crate::job::Job;
use crate::queue::TaskQueue;
use crate::runtime::{self, RuntimeRegistry};
use crate::sandbox::SandboxDriver;
use crate::store::ResultStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{error, info, warn};

pub struct Worker {
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn ResultStore>,
    registry: Arc<RuntimeRegistry>,
    sandbox: Arc<SandboxDriver>,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn ResultStore>,
        registry: Arc<RuntimeRegistry>,
        sandbox: Arc<SandboxDriver>,
    ) -> Self {
        Self { queue, store, registry, sandbox }
    }

    /// Claims jobs in a loop until `running` is cleared or `shutdown_file`
    /// (if given) appears on disk. Claim waits at most one second per cycle
    /// so shutdown is observed promptly between jobs; a job already claimed
    /// always runs to its own deadline before the next check.
    pub async fn run(&self, running: Arc<AtomicBool>, shutdown_file: Option<PathBuf>) {
        info!("worker started, waiting for jobs");

        while running.load(Ordering::Relaxed) && !Self::shutdown_requested(&shutdown_file).await {
            let job = match self.queue.claim(1).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "claim failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            self.process(job).await;
        }

        info!("worker stopped");
    }

    async fn shutdown_requested(shutdown_file: &Option<PathBuf>) -> bool {
        match shutdown_file {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    async fn process(&self, job: Job) {
        info!(job_id = %job.id, language = %job.language, "processing job");

        if let Err(e) = self.store.mark_running(&job.id).await {
            error!(job_id = %job.id, error = %e, "failed to mark job running");
        }

        if let Err(e) = job.config.validate() {
            self.fail(&job, "ValidationError", &e).await;
            return;
        }

        let runtime = match self.registry.get(&job.language) {
            Ok(runtime) => runtime,
            Err(e) => {
                self.fail(&job, "UnsupportedLanguage", &e.to_string()).await;
                return;
            }
        };

        let workspace = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                self.fail(&job, "WorkspaceError", &e.to_string()).await;
                return;
            }
        };

        let result = runtime::execute(
            runtime.as_ref(),
            &self.sandbox,
            &job.code,
            &job.config,
            &PathBuf::from(workspace.path()),
        )
        .await;

        match result {
            Ok(result) => {
                let status = if result.succeeded() { "COMPLETED" } else { "FAILED" };
                info!(job_id = %job.id, status, duration_ms = result.duration_ms, "job finished");
                if let Err(e) = self.store.save_result(&job.id, result).await {
                    error!(job_id = %job.id, error = %e, "failed to persist result");
                }
            }
            Err(e) => {
                self.fail(&job, "RuntimeError", &e.to_string()).await;
            }
        }

        if let Err(e) = self.queue.ack(&job.id).await {
            warn!(job_id = %job.id, error = %e, "failed to ack processing entry");
        }
    }

    async fn fail(&self, job: &Job, error_type: &str, message: &str) {
        error!(job_id = %job.id, error_type, message, "job failed");
        if let Err(e) = self.store.save_failure(&job.id, error_type, message).await {
            error!(job_id = %job.id, error = %e, "failed to persist failure");
        }
        if let Err(e) = self.queue.ack(&job.id).await {
            warn!(job_id = %job.id, error = %e, "failed to ack processing entry");
        }
    }
}
