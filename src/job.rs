//! Data model shared by every component: the config a caller submits, the
//! result a sandbox run produces, and the record the queue/store track
//! across a job's lifetime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default wall-clock budget, in seconds, when a caller does not specify one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// Smallest timeout a caller may request.
pub const MIN_TIMEOUT_SECS: u64 = 1;
/// Largest timeout a caller may request.
pub const MAX_TIMEOUT_SECS: u64 = 30;
/// Largest source payload accepted, in bytes.
pub const MAX_CODE_BYTES: usize = 100 * 1024;
/// Default memory ceiling for a sandbox container.
pub const DEFAULT_MEMORY_LIMIT: &str = "256m";
/// Default fractional CPU budget for a sandbox container.
pub const DEFAULT_CPU_LIMIT: f64 = 0.5;

/// Caller-supplied execution budget. Immutable once a job is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Wall-clock timeout in seconds, bounded to [`MIN_TIMEOUT_SECS`, MAX_TIMEOUT_SECS].
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Memory ceiling, e.g. `"256m"`.
    #[serde(default = "default_memory")]
    pub memory_limit: String,
    /// Fractional CPU core budget, e.g. `0.5`.
    #[serde(default = "default_cpu")]
    pub cpu_limit: f64,
    /// Whether the sandbox may reach the network.
    #[serde(default)]
    pub network_enabled: bool,
    /// Package names to install before running, validated against a
    /// per-language whitelist before any container is created.
    #[serde(default)]
    pub packages: Vec<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_memory() -> String {
    DEFAULT_MEMORY_LIMIT.to_string()
}
fn default_cpu() -> f64 {
    DEFAULT_CPU_LIMIT
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            cpu_limit: DEFAULT_CPU_LIMIT,
            network_enabled: false,
            packages: Vec::new(),
        }
    }
}

impl ExecutionConfig {
    /// Validates the budget fields a caller may tamper with.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(format!(
                "timeout must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS} seconds"
            ));
        }
        if self.cpu_limit <= 0.0 {
            return Err("cpu_limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Terminal observation produced by the Sandbox Driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    pub duration_ms: u64,
    pub timeout: bool,
    pub error_type: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timeout
    }
}

/// A queued unit of work, owned exclusively by whichever worker claims it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
    pub language: String,
    pub code: String,
    pub config: ExecutionConfig,
}

impl Job {
    pub fn new(language: impl Into<String>, code: impl Into<String>, config: ExecutionConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            submitted_at: Utc::now(),
            language: language.into(),
            code: code.into(),
            config,
        }
    }
}

/// Status a job occupies; transitions follow queued -> running -> terminal,
/// never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// The lifecycle row tracked by the Result Store, keyed by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub status: ExecutionStatus,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i64>,
    pub duration_ms: Option<u64>,
    pub timeout: Option<bool>,
    pub error_type: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    pub fn queued(id: impl Into<String>, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: ExecutionStatus::Queued,
            language: language.into(),
            created_at: now,
            updated_at: now,
            stdout: None,
            stderr: None,
            exit_code: None,
            duration_ms: None,
            timeout: None,
            error_type: None,
            completed_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
        self.updated_at = Utc::now();
    }

    /// Applies a terminal write. Derives status from exit_code/timeout and
    /// stamps completed_at. Idempotent calls after the first are a caller bug;
    /// invariant I2 relies on callers writing this exactly once per job id.
    pub fn mark_terminal(
        &mut self,
        stdout: String,
        stderr: String,
        exit_code: i64,
        duration_ms: u64,
        timeout: bool,
        error_type: Option<String>,
    ) {
        let now = Utc::now();
        self.status = if exit_code == 0 && !timeout {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self.exit_code = Some(exit_code);
        self.duration_ms = Some(duration_ms);
        self.timeout = Some(timeout);
        self.error_type = error_type;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    pub fn mark_failed(&mut self, error_type: impl Into<String>, message: impl Into<String>) {
        self.mark_terminal(String::new(), message.into(), -1, 0, false, Some(error_type.into()));
    }
}
