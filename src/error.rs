//! Error taxonomy for the sandbox execution pipeline.
//!
//! Leaf errors are typed with [`thiserror`] so callers can match on kind;
//! call sites that only need to propagate wrap them in [`anyhow::Error`]
//! via `.context(...)`.

use thiserror::Error;

/// Errors raised while driving a container through its lifecycle.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("docker daemon not reachable: {0}")]
    DaemonUnavailable(String),

    #[error("image {image} is not available and could not be pulled: {source}")]
    ImageMissing { image: String, source: anyhow::Error },

    #[error("failed to create container: {0}")]
    CreateFailed(String),

    #[error("failed to start container: {0}")]
    StartFailed(String),

    #[error("execution exceeded the {0}s deadline")]
    Timeout(u64),

    #[error("container wait failed: {0}")]
    WaitFailed(String),
}

/// Errors raised while resolving or preparing a language runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("package '{package}' is not on the {language} whitelist")]
    UnauthorizedPackage { language: String, package: String },

    #[error("language '{0}' accepts no packages (no whitelist is defined)")]
    NoWhitelistDefined(String),

    #[error("failed to prepare workspace: {0}")]
    PrepareFailed(#[from] std::io::Error),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Errors raised by a Task Queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("broker error: {0}")]
    Broker(String),
}

/// Errors raised by a Result Store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(String),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors surfaced at the dispatcher façade, one level above the pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no async backend is configured")]
    BackendUnavailable,
}
